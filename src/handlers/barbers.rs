use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Barber, Slot, WorkingHours};
use crate::services::slots;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BarberResponse {
    #[serde(flatten)]
    pub barber: Barber,
    pub schedule: Vec<WorkingHours>,
}

// GET /api/barbers
pub async fn list_barbers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BarberResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let barbers = queries::list_active_barbers(&db)?;

    let mut response = vec![];
    for barber in barbers {
        let schedule = queries::list_working_hours(&db, &barber.id)?;
        response.push(BarberResponse { barber, schedule });
    }
    Ok(Json(response))
}

// GET /api/barbers/:id
pub async fn get_barber(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BarberResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let barber = queries::get_barber(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("barber {id}")))?;
    let schedule = queries::list_working_hours(&db, &barber.id)?;
    Ok(Json(BarberResponse { barber, schedule }))
}

// GET /api/barbers/:id/slots?date=YYYY-MM-DD&service_id=xxx
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub service_id: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub barber_id: String,
    pub service_id: String,
    pub duration_minutes: i64,
    pub slots: Vec<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(barber_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", query.date)))?;

    let db = state.db.lock().unwrap();

    let barber = queries::get_barber(&db, &barber_id)?
        .filter(|b| b.active)
        .ok_or_else(|| AppError::NotFound(format!("barber {barber_id}")))?;

    let service = queries::get_service(&db, &query.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", query.service_id)))?;
    if service.duration_minutes <= 0 {
        return Err(AppError::Validation(format!(
            "service {} has a non-positive duration",
            service.id
        )));
    }

    let weekday = date.weekday().num_days_from_sunday() as u8;
    let hours = queries::get_working_hours(&db, &barber.id, weekday)?;

    let Some(hours) = hours.filter(|h| h.active) else {
        return Ok(Json(SlotsResponse {
            date: query.date,
            barber_id: barber.id,
            service_id: service.id,
            duration_minutes: service.duration_minutes,
            slots: vec![],
            reason: Some("barber does not work on this day".to_string()),
        }));
    };

    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
    let day_end = date.and_hms_opt(23, 59, 59).expect("valid time");
    let now = Local::now().naive_local();

    let occupied = queries::blocking_intervals(&db, &barber.id, &day_start, &day_end, &now)?;
    let slots = slots::generate_slots(
        date,
        hours.open()?,
        hours.close()?,
        service.duration_minutes,
        &occupied,
        now,
    );

    Ok(Json(SlotsResponse {
        date: query.date,
        barber_id: barber.id,
        service_id: service.id,
        duration_minutes: service.duration_minutes,
        slots,
        reason: None,
    }))
}
