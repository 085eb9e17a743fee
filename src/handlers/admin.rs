use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Actor};
use crate::db::queries::{self, ReservationFilter};
use crate::errors::AppError;
use crate::models::{Reservation, ReservationStatus, WorkingHours};
use crate::services::booking;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AdminReservationView {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub barber_id: String,
    pub barber: String,
    pub service: String,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub payment_status: String,
    pub amount_paid: Option<f64>,
    pub notes: Option<String>,
}

fn reservation_view(
    db: &rusqlite::Connection,
    reservation: Reservation,
) -> Result<AdminReservationView, AppError> {
    let barber = queries::get_barber(db, &reservation.barber_id)?
        .map(|b| b.name)
        .unwrap_or_default();
    let service = queries::get_service(db, &reservation.service_id)?
        .map(|s| s.name)
        .unwrap_or_default();
    Ok(AdminReservationView {
        id: reservation.id,
        client_name: reservation.client_name,
        client_email: reservation.client_email,
        client_phone: reservation.client_phone,
        barber_id: reservation.barber_id,
        barber,
        service,
        start_at: reservation.start_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        end_at: reservation.end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        status: reservation.status.as_str().to_string(),
        payment_status: reservation.payment_status.as_str().to_string(),
        amount_paid: reservation.amount_paid,
        notes: reservation.notes,
    })
}

// GET /api/admin/dashboard (admin only)
#[derive(Serialize)]
pub struct DashboardResponse {
    pub stats: queries::DashboardStats,
    pub upcoming: Vec<AdminReservationView>,
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;
    if actor != Actor::Admin {
        return Err(AppError::PermissionDenied);
    }

    let now = Local::now().naive_local();
    let stats = queries::get_dashboard_stats(&db, &now)?;

    let mut upcoming = vec![];
    for reservation in queries::upcoming_reservations(&db, &now, 10)? {
        upcoming.push(reservation_view(&db, reservation)?);
    }

    Ok(Json(DashboardResponse { stats, upcoming }))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub barber_id: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<AdminReservationView>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            ReservationStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))
        })
        .transpose()?;
    let date = query
        .date
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("invalid date: {d}")))
        })
        .transpose()?;

    // Barbers only ever see their own reservations
    let barber_id = match &actor {
        Actor::Admin => query.barber_id.clone(),
        Actor::Barber(id) => Some(id.clone()),
    };

    let filter = ReservationFilter {
        status,
        barber_id,
        date,
        limit: query.limit.unwrap_or(50).min(200),
    };

    let mut response = vec![];
    for reservation in queries::list_reservations(&db, &filter)? {
        response.push(reservation_view(&db, reservation)?);
    }
    Ok(Json(response))
}

// PATCH /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<AdminReservationView>, AppError> {
    let new_status = ReservationStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status: {}", body.status)))?;

    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;

    let now = Local::now().naive_local();
    let reservation = booking::staff_update_status(&db, &actor, &id, new_status, now)?;
    Ok(Json(reservation_view(&db, reservation)?))
}

// GET /api/admin/barbers/:id/schedule
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(barber_id): Path<String>,
) -> Result<Json<Vec<WorkingHours>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;
    if !auth::can_manage_barber(&actor, &barber_id) {
        return Err(AppError::PermissionDenied);
    }

    Ok(Json(queries::list_working_hours(&db, &barber_id)?))
}

// PUT /api/admin/barbers/:id/schedule
#[derive(Deserialize)]
pub struct ScheduleDay {
    pub weekday: u8,
    pub start_time: String,
    pub end_time: String,
    pub active: bool,
}

pub async fn put_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(barber_id): Path<String>,
    Json(days): Json<Vec<ScheduleDay>>,
) -> Result<Json<Vec<WorkingHours>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;
    if !auth::can_manage_barber(&actor, &barber_id) {
        return Err(AppError::PermissionDenied);
    }

    queries::get_barber(&db, &barber_id)?
        .ok_or_else(|| AppError::NotFound(format!("barber {barber_id}")))?;

    for day in &days {
        let hours = WorkingHours {
            barber_id: barber_id.clone(),
            weekday: day.weekday,
            start_time: day.start_time.clone(),
            end_time: day.end_time.clone(),
            active: day.active,
        };
        hours
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        queries::upsert_working_hours(&db, &hours)?;
    }

    Ok(Json(queries::list_working_hours(&db, &barber_id)?))
}

// GET /api/admin/stats/revenue (admin only)
#[derive(Deserialize)]
pub struct RevenueQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<queries::RevenueReport>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers, &state.config.admin_token)?;
    if actor != Actor::Admin {
        return Err(AppError::PermissionDenied);
    }

    let parse = |value: Option<&str>, end_of_day: bool| -> Result<Option<NaiveDateTime>, AppError> {
        value
            .map(|d| {
                let date = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| AppError::Validation(format!("invalid date: {d}")))?;
                let time = if end_of_day {
                    date.and_hms_opt(23, 59, 59)
                } else {
                    date.and_hms_opt(0, 0, 0)
                };
                Ok(time.expect("valid time"))
            })
            .transpose()
    };

    let from = parse(query.from.as_deref(), false)?;
    let to = parse(query.to.as_deref(), true)?;

    Ok(Json(queries::revenue_report(
        &db,
        from.as_ref(),
        to.as_ref(),
    )?))
}
