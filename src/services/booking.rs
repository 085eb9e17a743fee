use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::{self, Actor};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PaymentStatus, Reservation, ReservationStatus};

/// How long a Tentative reservation holds its interval while the client
/// pays. Matches the checkout session expiry.
pub const PAYMENT_WINDOW_MINUTES: i64 = 30;

/// Clients may cancel up to this long before the appointment starts.
pub const CANCELLATION_LEAD_HOURS: i64 = 2;

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub barber_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub start_at: NaiveDateTime,
    pub notes: Option<String>,
}

/// Create a Tentative reservation iff the requested interval is free.
///
/// Preconditions are checked in order, each with its own failure mode:
/// input validation, barber exists and is active, service exists and is
/// active, then the overlap check. The last one is not a read: the insert
/// itself is conditional on no blocking overlap existing, executed as a
/// single SQL statement, so two racing requests for the same interval
/// resolve to exactly one inserted row and the loser sees Conflict.
pub fn try_reserve(
    conn: &Connection,
    req: &ReserveRequest,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    validate_request(req, now)?;

    let barber = queries::get_barber(conn, &req.barber_id)?
        .filter(|b| b.active)
        .ok_or_else(|| AppError::NotFound(format!("barber {}", req.barber_id)))?;

    let service = queries::get_service(conn, &req.service_id)?
        .filter(|s| s.active)
        .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id)))?;

    if service.duration_minutes <= 0 {
        return Err(AppError::Validation(format!(
            "service {} has a non-positive duration",
            service.id
        )));
    }

    let reservation = Reservation {
        id: Uuid::new_v4().to_string(),
        barber_id: barber.id,
        service_id: service.id,
        client_name: req.client_name.trim().to_string(),
        client_email: req.client_email.trim().to_lowercase(),
        client_phone: req.client_phone.trim().to_string(),
        start_at: req.start_at,
        end_at: req.start_at + Duration::minutes(service.duration_minutes),
        status: ReservationStatus::Tentative,
        payment_status: PaymentStatus::Unpaid,
        payment_session_id: None,
        payment_ref: None,
        amount_paid: None,
        notes: req.notes.clone(),
        expires_at: Some(now + Duration::minutes(PAYMENT_WINDOW_MINUTES)),
        reminder_sent_at: None,
        created_at: now,
        updated_at: now,
    };

    if !queries::insert_reservation_if_free(conn, &reservation, &now)? {
        return Err(AppError::Conflict(
            "this time slot is already taken, please pick another".to_string(),
        ));
    }

    tracing::info!(
        reservation_id = %reservation.id,
        barber_id = %reservation.barber_id,
        start_at = %reservation.start_at,
        "reservation created"
    );
    Ok(reservation)
}

fn validate_request(req: &ReserveRequest, now: NaiveDateTime) -> Result<(), AppError> {
    if req.client_name.trim().len() < 2 {
        return Err(AppError::Validation("client name is required".to_string()));
    }
    if !req.client_email.contains('@') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if req.client_phone.trim().len() < 9 {
        return Err(AppError::Validation("invalid phone number".to_string()));
    }
    if req.start_at < now {
        return Err(AppError::Validation("cannot book a time in the past".to_string()));
    }
    Ok(())
}

/// Client-initiated cancellation. Requires the requester's email to match
/// the reservation and at least 2 hours of lead time; exactly 2 hours is
/// still allowed. The lead-time failure is distinct from the terminal-state
/// one so callers can tell "too late" from "already over".
pub fn cancel_by_client(
    conn: &Connection,
    reservation_id: &str,
    client_email: &str,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    let reservation = queries::get_reservation(conn, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;

    if !reservation
        .client_email
        .eq_ignore_ascii_case(client_email.trim())
    {
        return Err(AppError::PermissionDenied);
    }

    if reservation.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "reservation is already {}",
            reservation.status.as_str()
        )));
    }

    if reservation.start_at - now < Duration::hours(CANCELLATION_LEAD_HOURS) {
        return Err(AppError::Validation(format!(
            "cancellation requires at least {CANCELLATION_LEAD_HOURS} hours notice"
        )));
    }

    let updated = queries::transition_status(
        conn,
        reservation_id,
        &[ReservationStatus::Tentative, ReservationStatus::Confirmed],
        ReservationStatus::Cancelled,
        &now,
    )?;
    if !updated {
        // Lost a race with another transition since the read above
        return Err(AppError::InvalidState(
            "reservation is no longer cancellable".to_string(),
        ));
    }

    tracing::info!(reservation_id, "reservation cancelled by client");
    queries::get_reservation(conn, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))
}

/// Payment success event: Tentative -> Confirmed. The update is guarded on
/// the current status, so a stale event for a cancelled or already-confirmed
/// reservation changes nothing and reports InvalidState.
pub fn confirm_payment(
    conn: &Connection,
    reservation_id: &str,
    payment_ref: &str,
    amount_paid: f64,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    let confirmed = queries::confirm_paid(conn, reservation_id, payment_ref, amount_paid, &now)?;
    if !confirmed {
        let current = queries::get_reservation(conn, reservation_id)?
            .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;
        return Err(AppError::InvalidState(format!(
            "payment confirmed for a reservation that is {}",
            current.status.as_str()
        )));
    }

    tracing::info!(reservation_id, amount_paid, "payment confirmed");
    queries::get_reservation(conn, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))
}

/// Payment failure or session expiry: Tentative -> Cancelled. Returns false
/// when the reservation had already left Tentative (stale event).
pub fn payment_failed(
    conn: &Connection,
    reservation_id: &str,
    now: NaiveDateTime,
) -> Result<bool, AppError> {
    let cancelled = queries::cancel_unpaid(conn, reservation_id, &now)?;
    if cancelled {
        tracing::info!(reservation_id, "reservation released after failed payment");
    }
    Ok(cancelled)
}

/// Staff transition out of Confirmed. Admins may touch any reservation,
/// barbers only their own. Completed and NoShow additionally require the
/// appointment time to have arrived.
pub fn staff_update_status(
    conn: &Connection,
    actor: &Actor,
    reservation_id: &str,
    new_status: ReservationStatus,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    let reservation = queries::get_reservation(conn, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;

    if !auth::can_manage_barber(actor, &reservation.barber_id) {
        return Err(AppError::PermissionDenied);
    }

    let allowed = matches!(
        new_status,
        ReservationStatus::Cancelled | ReservationStatus::Completed | ReservationStatus::NoShow
    );
    if !allowed {
        return Err(AppError::Validation(format!(
            "staff cannot set status {}",
            new_status.as_str()
        )));
    }

    if reservation.status != ReservationStatus::Confirmed {
        return Err(AppError::InvalidState(format!(
            "cannot move a {} reservation to {}",
            reservation.status.as_str(),
            new_status.as_str()
        )));
    }

    if matches!(
        new_status,
        ReservationStatus::Completed | ReservationStatus::NoShow
    ) && now < reservation.start_at
    {
        return Err(AppError::InvalidState(format!(
            "cannot mark as {} before the appointment time",
            new_status.as_str()
        )));
    }

    let updated = queries::transition_status(
        conn,
        reservation_id,
        &[ReservationStatus::Confirmed],
        new_status,
        &now,
    )?;
    if !updated {
        return Err(AppError::InvalidState(
            "reservation changed concurrently".to_string(),
        ));
    }

    tracing::info!(reservation_id, status = new_status.as_str(), "status updated by staff");
    queries::get_reservation(conn, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Barber, Service};
    use std::sync::{Arc, Mutex};

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_barber(
            &conn,
            &Barber {
                id: "b1".to_string(),
                name: "Marco".to_string(),
                bio: None,
                specialty: Some("fades".to_string()),
                photo_url: None,
                active: true,
            },
            Some("barber-token"),
        )
        .unwrap();
        queries::insert_service(
            &conn,
            &Service {
                id: "s1".to_string(),
                name: "Haircut".to_string(),
                duration_minutes: 30,
                price: 15.0,
                active: true,
            },
        )
        .unwrap();
        conn
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn request(start: &str) -> ReserveRequest {
        ReserveRequest {
            barber_id: "b1".to_string(),
            service_id: "s1".to_string(),
            client_name: "Alice".to_string(),
            client_email: "alice@example.com".to_string(),
            client_phone: "+351911111111".to_string(),
            start_at: dt(start),
            notes: None,
        }
    }

    fn now() -> NaiveDateTime {
        dt("2025-06-16 08:00:00")
    }

    #[test]
    fn test_reserve_success() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Tentative);
        assert_eq!(r.end_at, dt("2025-06-16 14:30:00"));
        assert_eq!(r.expires_at, Some(dt("2025-06-16 08:30:00")));
    }

    #[test]
    fn test_reserve_unknown_barber() {
        let conn = setup_db();
        let mut req = request("2025-06-16 14:00:00");
        req.barber_id = "ghost".to_string();
        assert!(matches!(
            try_reserve(&conn, &req, now()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_reserve_inactive_service() {
        let conn = setup_db();
        queries::insert_service(
            &conn,
            &Service {
                id: "s2".to_string(),
                name: "Retired cut".to_string(),
                duration_minutes: 30,
                price: 10.0,
                active: false,
            },
        )
        .unwrap();
        let mut req = request("2025-06-16 14:00:00");
        req.service_id = "s2".to_string();
        assert!(matches!(
            try_reserve(&conn, &req, now()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_reserve_in_the_past_rejected() {
        let conn = setup_db();
        assert!(matches!(
            try_reserve(&conn, &request("2025-06-16 07:00:00"), now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_overlapping_reserve_conflicts() {
        let conn = setup_db();
        try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        // Same interval
        assert!(matches!(
            try_reserve(&conn, &request("2025-06-16 14:00:00"), now()),
            Err(AppError::Conflict(_))
        ));
        // Straddling the first half
        assert!(matches!(
            try_reserve(&conn, &request("2025-06-16 13:45:00"), now()),
            Err(AppError::Conflict(_))
        ));
        // Adjacent after: [14:30, 15:00) touches [14:00, 14:30) only at the
        // boundary and must succeed
        try_reserve(&conn, &request("2025-06-16 14:30:00"), now()).unwrap();
    }

    #[test]
    fn test_expired_tentative_does_not_block() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        // Payment window lapses without confirmation
        let later = dt("2025-06-16 08:30:00");
        assert!(r.expires_at.unwrap() <= later);

        let winner = try_reserve(&conn, &request("2025-06-16 14:00:00"), later).unwrap();
        assert_ne!(winner.id, r.id);

        // Once swept, the stale hold is cancelled outright
        let swept = queries::cancel_expired_tentative(&conn, &later).unwrap();
        assert_eq!(swept, 1);
        let stale = queries::get_reservation(&conn, &r.id).unwrap().unwrap();
        assert_eq!(stale.status, ReservationStatus::Cancelled);
        let held = queries::get_reservation(&conn, &winner.id).unwrap().unwrap();
        assert_eq!(held.status, ReservationStatus::Tentative);
    }

    #[test]
    fn test_concurrent_reserves_exactly_one_wins() {
        let conn = Arc::new(Mutex::new(setup_db()));
        let mut handles = vec![];

        // Pairwise-overlapping intervals: same start, 30-minute duration
        for _ in 0..8 {
            let conn = Arc::clone(&conn);
            handles.push(std::thread::spawn(move || {
                let db = conn.lock().unwrap();
                try_reserve(&db, &request("2025-06-16 14:00:00"), now())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);

        // The persisted blocking set holds exactly one row for the interval
        let db = conn.lock().unwrap();
        let intervals = queries::blocking_intervals(
            &db,
            "b1",
            &dt("2025-06-16 00:00:00"),
            &dt("2025-06-16 23:59:59"),
            &now(),
        )
        .unwrap();
        assert_eq!(intervals.len(), 1);
    }

    #[test]
    fn test_cancel_at_exactly_two_hours() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        let cancelled =
            cancel_by_client(&conn, &r.id, "alice@example.com", dt("2025-06-16 12:00:00")).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_cancel_one_second_inside_window_fails() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        let err =
            cancel_by_client(&conn, &r.id, "alice@example.com", dt("2025-06-16 12:00:01"))
                .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_cancel_wrong_email_denied() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        let err = cancel_by_client(&conn, &r.id, "mallory@example.com", now()).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }

    #[test]
    fn test_cancel_terminal_state_distinct_error() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();
        cancel_by_client(&conn, &r.id, "alice@example.com", now()).unwrap();

        let err = cancel_by_client(&conn, &r.id, "alice@example.com", now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_payment_confirm_and_staff_complete() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        let confirmed = confirm_payment(&conn, &r.id, "pi_123", 15.0, now()).unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert_eq!(confirmed.amount_paid, Some(15.0));

        // Too early to complete
        let err = staff_update_status(
            &conn,
            &Actor::Admin,
            &r.id,
            ReservationStatus::Completed,
            dt("2025-06-16 13:00:00"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let done = staff_update_status(
            &conn,
            &Actor::Admin,
            &r.id,
            ReservationStatus::Completed,
            dt("2025-06-16 14:05:00"),
        )
        .unwrap();
        assert_eq!(done.status, ReservationStatus::Completed);

        // Terminal: nothing moves it again
        let err = staff_update_status(
            &conn,
            &Actor::Admin,
            &r.id,
            ReservationStatus::NoShow,
            dt("2025-06-16 15:00:00"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_stale_payment_event_is_rejected() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();
        cancel_by_client(&conn, &r.id, "alice@example.com", now()).unwrap();

        let err = confirm_payment(&conn, &r.id, "pi_late", 15.0, now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        let current = queries::get_reservation(&conn, &r.id).unwrap().unwrap();
        assert_eq!(current.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_payment_failed_releases_hold() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();

        assert!(payment_failed(&conn, &r.id, now()).unwrap());
        // Idempotent for stale events
        assert!(!payment_failed(&conn, &r.id, now()).unwrap());

        // Slot is free again
        try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();
    }

    #[test]
    fn test_barber_cannot_touch_other_barbers_reservation() {
        let conn = setup_db();
        let r = try_reserve(&conn, &request("2025-06-16 14:00:00"), now()).unwrap();
        confirm_payment(&conn, &r.id, "pi_123", 15.0, now()).unwrap();

        let err = staff_update_status(
            &conn,
            &Actor::Barber("someone-else".to_string()),
            &r.id,
            ReservationStatus::Completed,
            dt("2025-06-16 14:05:00"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }
}
