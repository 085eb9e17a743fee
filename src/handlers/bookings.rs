use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::booking::{self, ReserveRequest};
use crate::services::notifications;
use crate::services::payments::SessionRequest;
use crate::state::AppState;

fn parse_start_at(s: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| AppError::Validation(format!("invalid start time: {s}")))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub barber_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub start_at: String,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub reservation: ReservationView,
    pub payment: PaymentView,
}

#[derive(Serialize)]
pub struct ReservationView {
    pub id: String,
    pub client_name: String,
    pub barber: String,
    pub service: String,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub price: f64,
}

#[derive(Serialize)]
pub struct PaymentView {
    pub checkout_url: String,
    pub session_id: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let start_at = parse_start_at(&body.start_at)?;
    let now = Local::now().naive_local();

    let request = ReserveRequest {
        barber_id: body.barber_id,
        service_id: body.service_id,
        client_name: body.client_name,
        client_email: body.client_email,
        client_phone: body.client_phone,
        start_at,
        notes: body.notes,
    };

    // Reserve the interval first; the checkout session references the
    // already-persisted Tentative row.
    let (reservation, barber, service) = {
        let db = state.db.lock().unwrap();
        let reservation = booking::try_reserve(&db, &request, now)?;
        let barber = queries::get_barber(&db, &reservation.barber_id)?
            .ok_or_else(|| AppError::NotFound(format!("barber {}", reservation.barber_id)))?;
        let service = queries::get_service(&db, &reservation.service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {}", reservation.service_id)))?;
        (reservation, barber, service)
    };

    let session = state
        .payments
        .create_session(&SessionRequest {
            reservation_id: reservation.id.clone(),
            client_email: reservation.client_email.clone(),
            client_name: reservation.client_name.clone(),
            service_name: service.name.clone(),
            amount: service.price,
        })
        .await;

    let session = match session {
        Ok(session) => session,
        Err(e) => {
            // Release the hold: without a checkout session the client can
            // never pay for it.
            tracing::error!(error = %e, reservation_id = %reservation.id, "checkout session creation failed");
            let db = state.db.lock().unwrap();
            queries::cancel_unpaid(&db, &reservation.id, &now)?;
            return Err(AppError::Payment("could not start payment".to_string()));
        }
    };

    {
        let db = state.db.lock().unwrap();
        queries::set_payment_session(&db, &reservation.id, &session.id)?;
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            reservation: ReservationView {
                id: reservation.id,
                client_name: reservation.client_name,
                barber: barber.name,
                service: service.name,
                start_at: reservation.start_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                end_at: reservation.end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                status: reservation.status.as_str().to_string(),
                price: service.price,
            },
            payment: PaymentView {
                checkout_url: session.url,
                session_id: session.id,
            },
        }),
    ))
}

// GET /api/bookings/:id
#[derive(Serialize)]
pub struct BookingDetail {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    pub barber: String,
    pub service: String,
    pub price: f64,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub payment_status: String,
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingDetail>, AppError> {
    let db = state.db.lock().unwrap();
    let reservation = queries::get_reservation(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {id}")))?;
    let barber = queries::get_barber(&db, &reservation.barber_id)?
        .map(|b| b.name)
        .unwrap_or_default();
    let service = queries::get_service(&db, &reservation.service_id)?;

    Ok(Json(BookingDetail {
        id: reservation.id,
        client_name: reservation.client_name,
        client_email: reservation.client_email,
        barber,
        service: service.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
        price: service.map(|s| s.price).unwrap_or(0.0),
        start_at: reservation.start_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        end_at: reservation.end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        status: reservation.status.as_str().to_string(),
        payment_status: reservation.payment_status.as_str().to_string(),
    }))
}

// GET /api/bookings/my?email=...
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub email: String,
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    if !query.email.contains('@') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }

    let db = state.db.lock().unwrap();
    let reservations = queries::reservations_for_client(&db, &query.email.to_lowercase(), 20)?;

    let mut response = vec![];
    for reservation in reservations {
        let barber = queries::get_barber(&db, &reservation.barber_id)?
            .map(|b| b.name)
            .unwrap_or_default();
        let service = queries::get_service(&db, &reservation.service_id)?;
        response.push(BookingDetail {
            id: reservation.id,
            client_name: reservation.client_name,
            client_email: reservation.client_email,
            barber,
            service: service.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            price: service.map(|s| s.price).unwrap_or(0.0),
            start_at: reservation.start_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            end_at: reservation.end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: reservation.status.as_str().to_string(),
            payment_status: reservation.payment_status.as_str().to_string(),
        });
    }
    Ok(Json(response))
}

// DELETE /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub client_email: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CancelBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let now = Local::now().naive_local();

    let reservation = {
        let db = state.db.lock().unwrap();
        booking::cancel_by_client(&db, &id, &body.client_email, now)?
    };

    notifications::send_cancellation(
        state.notifier.as_ref(),
        &state.config.business_name,
        &reservation,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "reservation cancelled" })))
}
