use chrono::{Datelike, Duration, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::models::{
    Barber, PaymentStatus, Reservation, ReservationStatus, Service, WorkingHours,
};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// A reservation blocks its interval while it is Confirmed, or Tentative
// with an unexpired payment window. The same predicate backs slot
// generation and the conditional insert, so the two can never disagree.
const BLOCKING_PREDICATE: &str =
    "(status = 'confirmed' OR (status = 'tentative' AND (expires_at IS NULL OR expires_at > :now)))";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_dt(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DT_FORMAT)
        .map_err(|_| anyhow::anyhow!("invalid timestamp in database: {s}"))
}

// ── Barbers ──

pub fn insert_barber(
    conn: &Connection,
    barber: &Barber,
    api_token: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO barbers (id, name, bio, specialty, photo_url, api_token, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            barber.id,
            barber.name,
            barber.bio,
            barber.specialty,
            barber.photo_url,
            api_token,
            barber.active,
        ],
    )?;
    Ok(())
}

pub fn list_active_barbers(conn: &Connection) -> anyhow::Result<Vec<Barber>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, bio, specialty, photo_url, active
         FROM barbers WHERE active = 1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_barber_row)?;

    let mut barbers = vec![];
    for row in rows {
        barbers.push(row?);
    }
    Ok(barbers)
}

pub fn get_barber(conn: &Connection, id: &str) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        "SELECT id, name, bio, specialty, photo_url, active FROM barbers WHERE id = ?1",
        params![id],
        parse_barber_row,
    );

    match result {
        Ok(barber) => Ok(Some(barber)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_barber_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        "SELECT id, name, bio, specialty, photo_url, active
         FROM barbers WHERE api_token = ?1 AND active = 1",
        params![token],
        parse_barber_row,
    );

    match result {
        Ok(barber) => Ok(Some(barber)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_barber_row(row: &Row) -> rusqlite::Result<Barber> {
    Ok(Barber {
        id: row.get(0)?,
        name: row.get(1)?,
        bio: row.get(2)?,
        specialty: row.get(3)?,
        photo_url: row.get(4)?,
        active: row.get(5)?,
    })
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.duration_minutes,
            service.price,
            service.active,
        ],
    )?;
    Ok(())
}

pub fn list_active_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, duration_minutes, price, active
         FROM services WHERE active = 1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, price, active FROM services WHERE id = ?1",
        params![id],
        parse_service_row,
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_service_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        duration_minutes: row.get(2)?,
        price: row.get(3)?,
        active: row.get(4)?,
    })
}

// ── Working hours ──

pub fn get_working_hours(
    conn: &Connection,
    barber_id: &str,
    weekday: u8,
) -> anyhow::Result<Option<WorkingHours>> {
    let result = conn.query_row(
        "SELECT barber_id, weekday, start_time, end_time, active
         FROM working_hours WHERE barber_id = ?1 AND weekday = ?2",
        params![barber_id, weekday],
        parse_working_hours_row,
    );

    match result {
        Ok(hours) => Ok(Some(hours)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_working_hours(conn: &Connection, barber_id: &str) -> anyhow::Result<Vec<WorkingHours>> {
    let mut stmt = conn.prepare(
        "SELECT barber_id, weekday, start_time, end_time, active
         FROM working_hours WHERE barber_id = ?1 ORDER BY weekday ASC",
    )?;
    let rows = stmt.query_map(params![barber_id], parse_working_hours_row)?;

    let mut hours = vec![];
    for row in rows {
        hours.push(row?);
    }
    Ok(hours)
}

pub fn upsert_working_hours(conn: &Connection, hours: &WorkingHours) -> anyhow::Result<()> {
    hours.validate()?;
    conn.execute(
        "INSERT INTO working_hours (barber_id, weekday, start_time, end_time, active)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(barber_id, weekday) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           active = excluded.active",
        params![
            hours.barber_id,
            hours.weekday,
            hours.start_time,
            hours.end_time,
            hours.active,
        ],
    )?;
    Ok(())
}

fn parse_working_hours_row(row: &Row) -> rusqlite::Result<WorkingHours> {
    Ok(WorkingHours {
        barber_id: row.get(0)?,
        weekday: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        active: row.get(4)?,
    })
}

// ── Reservations ──

const RESERVATION_COLUMNS: &str =
    "id, barber_id, service_id, client_name, client_email, client_phone, start_at, end_at, \
     status, payment_status, payment_session_id, payment_ref, amount_paid, notes, expires_at, \
     reminder_sent_at, created_at, updated_at";

/// Blocking [start, end) intervals for a barber within a range, ordered by
/// start. Feeds the slot generator.
pub fn blocking_intervals(
    conn: &Connection,
    barber_id: &str,
    range_start: &NaiveDateTime,
    range_end: &NaiveDateTime,
    now: &NaiveDateTime,
) -> anyhow::Result<Vec<(NaiveDateTime, NaiveDateTime)>> {
    let sql = format!(
        "SELECT start_at, end_at FROM reservations
         WHERE barber_id = :barber_id AND start_at >= :range_start AND start_at <= :range_end
           AND {BLOCKING_PREDICATE}
         ORDER BY start_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::named_params! {
            ":barber_id": barber_id,
            ":range_start": fmt_dt(range_start),
            ":range_end": fmt_dt(range_end),
            ":now": fmt_dt(now),
        },
        |row| {
            let start: String = row.get(0)?;
            let end: String = row.get(1)?;
            Ok((start, end))
        },
    )?;

    let mut intervals = vec![];
    for row in rows {
        let (start, end) = row?;
        intervals.push((parse_dt(&start)?, parse_dt(&end)?));
    }
    Ok(intervals)
}

/// Atomic conditional insert: the new row is written only if no blocking
/// reservation for the same barber overlaps [start_at, end_at). SQLite
/// executes the statement atomically, so concurrent callers cannot both
/// pass the NOT EXISTS check: exactly one insert wins.
pub fn insert_reservation_if_free(
    conn: &Connection,
    r: &Reservation,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let sql = format!(
        "INSERT INTO reservations ({RESERVATION_COLUMNS})
         SELECT :id, :barber_id, :service_id, :client_name, :client_email, :client_phone,
                :start_at, :end_at, :status, :payment_status, NULL, NULL, NULL, :notes,
                :expires_at, NULL, :created_at, :updated_at
         WHERE NOT EXISTS (
             SELECT 1 FROM reservations
             WHERE barber_id = :barber_id
               AND start_at < :end_at AND end_at > :start_at
               AND {BLOCKING_PREDICATE}
         )"
    );
    let inserted = conn.execute(
        &sql,
        rusqlite::named_params! {
            ":id": r.id,
            ":barber_id": r.barber_id,
            ":service_id": r.service_id,
            ":client_name": r.client_name,
            ":client_email": r.client_email,
            ":client_phone": r.client_phone,
            ":start_at": fmt_dt(&r.start_at),
            ":end_at": fmt_dt(&r.end_at),
            ":status": r.status.as_str(),
            ":payment_status": r.payment_status.as_str(),
            ":notes": r.notes,
            ":expires_at": r.expires_at.as_ref().map(fmt_dt),
            ":created_at": fmt_dt(&r.created_at),
            ":updated_at": fmt_dt(&r.updated_at),
            ":now": fmt_dt(now),
        },
    )?;
    Ok(inserted > 0)
}

pub fn get_reservation(conn: &Connection, id: &str) -> anyhow::Result<Option<Reservation>> {
    let result = conn.query_row(
        &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1"),
        params![id],
        |row| Ok(parse_reservation_row(row)),
    );

    match result {
        Ok(reservation) => Ok(Some(reservation?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_payment_session(conn: &Connection, id: &str, session_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE reservations SET payment_session_id = ?1 WHERE id = ?2",
        params![session_id, id],
    )?;
    Ok(())
}

/// Guarded status transition: updates only when the current status is one
/// of `from`, so a terminal row can never be overwritten. Returns whether
/// a row changed.
pub fn transition_status(
    conn: &Connection,
    id: &str,
    from: &[ReservationStatus],
    to: ReservationStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let placeholders: Vec<String> = (3..3 + from.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "UPDATE reservations SET status = ?1, updated_at = ?2 WHERE id = ?{} AND status IN ({})",
        3 + from.len(),
        placeholders.join(", ")
    );

    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(to.as_str()), Box::new(fmt_dt(now))];
    for status in from {
        values.push(Box::new(status.as_str()));
    }
    values.push(Box::new(id.to_string()));

    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, refs.as_slice())?;
    Ok(count > 0)
}

/// Tentative -> Confirmed on payment success, recording what was paid.
/// Guarded on status so a stale webhook cannot resurrect a cancelled row.
pub fn confirm_paid(
    conn: &Connection,
    id: &str,
    payment_ref: &str,
    amount_paid: f64,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE reservations
         SET status = 'confirmed', payment_status = 'paid', payment_ref = ?1,
             amount_paid = ?2, expires_at = NULL, updated_at = ?3
         WHERE id = ?4 AND status = 'tentative'",
        params![payment_ref, amount_paid, fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

/// Tentative -> Cancelled when the payment session fails or expires.
pub fn cancel_unpaid(conn: &Connection, id: &str, now: &NaiveDateTime) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE reservations
         SET status = 'cancelled', payment_status = 'failed', updated_at = ?1
         WHERE id = ?2 AND status = 'tentative'",
        params![fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn mark_refunded(
    conn: &Connection,
    payment_ref: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE reservations SET payment_status = 'refunded', updated_at = ?1
         WHERE payment_ref = ?2",
        params![fmt_dt(now), payment_ref],
    )?;
    Ok(count)
}

/// Reconciliation sweep: Tentative rows whose payment window lapsed stop
/// blocking immediately via the predicate; this flips them to Cancelled so
/// they do not linger in listings.
pub fn cancel_expired_tentative(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE reservations
         SET status = 'cancelled', payment_status = 'failed', updated_at = ?1
         WHERE status = 'tentative' AND expires_at IS NOT NULL AND expires_at <= ?1",
        params![fmt_dt(now)],
    )?;
    Ok(count)
}

pub fn reservations_for_client(
    conn: &Connection,
    email: &str,
    limit: i64,
) -> anyhow::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations
         WHERE client_email = ?1 ORDER BY start_at DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![email, limit], |row| Ok(parse_reservation_row(row)))?;

    let mut reservations = vec![];
    for row in rows {
        reservations.push(row??);
    }
    Ok(reservations)
}

#[derive(Debug, Default)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub barber_id: Option<String>,
    pub date: Option<chrono::NaiveDate>,
    pub limit: i64,
}

pub fn list_reservations(
    conn: &Connection,
    filter: &ReservationFilter,
) -> anyhow::Result<Vec<Reservation>> {
    let mut clauses: Vec<String> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(barber_id) = &filter.barber_id {
        values.push(Box::new(barber_id.clone()));
        clauses.push(format!("barber_id = ?{}", values.len()));
    }
    if let Some(date) = filter.date {
        let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let day_end = date.and_hms_opt(23, 59, 59).expect("valid time");
        values.push(Box::new(fmt_dt(&day_start)));
        clauses.push(format!("start_at >= ?{}", values.len()));
        values.push(Box::new(fmt_dt(&day_end)));
        clauses.push(format!("start_at <= ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(Box::new(filter.limit.max(1)));
    let sql = format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations {where_clause}
         ORDER BY start_at DESC LIMIT ?{}",
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), |row| Ok(parse_reservation_row(row)))?;

    let mut reservations = vec![];
    for row in rows {
        reservations.push(row??);
    }
    Ok(reservations)
}

/// Confirmed reservations starting inside the window that have not been
/// reminded yet.
pub fn reservations_needing_reminder(
    conn: &Connection,
    window_start: &NaiveDateTime,
    window_end: &NaiveDateTime,
) -> anyhow::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations
         WHERE status = 'confirmed' AND reminder_sent_at IS NULL
           AND start_at >= ?1 AND start_at <= ?2
         ORDER BY start_at ASC"
    ))?;
    let rows = stmt.query_map(
        params![fmt_dt(window_start), fmt_dt(window_end)],
        |row| Ok(parse_reservation_row(row)),
    )?;

    let mut reservations = vec![];
    for row in rows {
        reservations.push(row??);
    }
    Ok(reservations)
}

pub fn mark_reminder_sent(conn: &Connection, id: &str, now: &NaiveDateTime) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE reservations SET reminder_sent_at = ?1 WHERE id = ?2",
        params![fmt_dt(now), id],
    )?;
    Ok(())
}

// ── Aggregates ──

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_reservations: i64,
    pub today_reservations: i64,
    pub month_revenue: f64,
    pub tentative_count: i64,
    pub no_shows: i64,
    pub no_show_rate: f64,
}

pub fn get_dashboard_stats(
    conn: &Connection,
    now: &NaiveDateTime,
) -> anyhow::Result<DashboardStats> {
    let today_start = now.date().and_hms_opt(0, 0, 0).expect("midnight is valid");
    let today_end = today_start + Duration::days(1);
    let month_start = now
        .date()
        .with_day(1)
        .expect("day 1 is valid")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid");

    let total_reservations: i64 =
        conn.query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))?;

    let today_reservations: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reservations
         WHERE start_at >= ?1 AND start_at < ?2 AND status IN ('confirmed', 'completed')",
        params![fmt_dt(&today_start), fmt_dt(&today_end)],
        |row| row.get(0),
    )?;

    let month_revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_paid), 0) FROM reservations
         WHERE status = 'completed' AND start_at >= ?1",
        params![fmt_dt(&month_start)],
        |row| row.get(0),
    )?;

    let tentative_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reservations WHERE status = 'tentative'",
        [],
        |row| row.get(0),
    )?;

    let no_shows: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reservations WHERE status = 'no_show'",
        [],
        |row| row.get(0),
    )?;

    let finished: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reservations WHERE status IN ('completed', 'no_show')",
        [],
        |row| row.get(0),
    )?;
    let no_show_rate = if finished > 0 {
        no_shows as f64 / finished as f64 * 100.0
    } else {
        0.0
    };

    Ok(DashboardStats {
        total_reservations,
        today_reservations,
        month_revenue,
        tentative_count,
        no_shows,
        no_show_rate,
    })
}

pub fn upcoming_reservations(
    conn: &Connection,
    now: &NaiveDateTime,
    limit: i64,
) -> anyhow::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations
         WHERE status IN ('tentative', 'confirmed') AND start_at >= ?1
         ORDER BY start_at ASC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![fmt_dt(now), limit], |row| {
        Ok(parse_reservation_row(row))
    })?;

    let mut reservations = vec![];
    for row in rows {
        reservations.push(row??);
    }
    Ok(reservations)
}

#[derive(Debug, Serialize)]
pub struct RevenueLine {
    pub name: String,
    pub revenue: f64,
    pub reservations: i64,
}

#[derive(Debug, Serialize)]
pub struct RevenueReport {
    pub total_revenue: f64,
    pub total_reservations: i64,
    pub by_barber: Vec<RevenueLine>,
    pub by_service: Vec<RevenueLine>,
}

/// Revenue over completed reservations in [from, to], grouped by barber and
/// by service.
pub fn revenue_report(
    conn: &Connection,
    from: Option<&NaiveDateTime>,
    to: Option<&NaiveDateTime>,
) -> anyhow::Result<RevenueReport> {
    let from_str = from
        .map(fmt_dt)
        .unwrap_or_else(|| "0000-01-01 00:00:00".to_string());
    let to_str = to
        .map(fmt_dt)
        .unwrap_or_else(|| "9999-12-31 23:59:59".to_string());

    let (total_revenue, total_reservations): (f64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(amount_paid), 0), COUNT(*) FROM reservations
         WHERE status = 'completed' AND start_at >= ?1 AND start_at <= ?2",
        params![from_str, to_str],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let by_barber = grouped_revenue(
        conn,
        "SELECT b.name, COALESCE(SUM(r.amount_paid), 0), COUNT(*)
         FROM reservations r JOIN barbers b ON b.id = r.barber_id
         WHERE r.status = 'completed' AND r.start_at >= ?1 AND r.start_at <= ?2
         GROUP BY r.barber_id ORDER BY 2 DESC",
        &from_str,
        &to_str,
    )?;
    let by_service = grouped_revenue(
        conn,
        "SELECT s.name, COALESCE(SUM(r.amount_paid), 0), COUNT(*)
         FROM reservations r JOIN services s ON s.id = r.service_id
         WHERE r.status = 'completed' AND r.start_at >= ?1 AND r.start_at <= ?2
         GROUP BY r.service_id ORDER BY 2 DESC",
        &from_str,
        &to_str,
    )?;

    Ok(RevenueReport {
        total_revenue,
        total_reservations,
        by_barber,
        by_service,
    })
}

fn grouped_revenue(
    conn: &Connection,
    sql: &str,
    from: &str,
    to: &str,
) -> anyhow::Result<Vec<RevenueLine>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![from, to], |row| {
        Ok(RevenueLine {
            name: row.get(0)?,
            revenue: row.get(1)?,
            reservations: row.get(2)?,
        })
    })?;

    let mut lines = vec![];
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

fn parse_reservation_row(row: &Row) -> anyhow::Result<Reservation> {
    let start_at: String = row.get(6)?;
    let end_at: String = row.get(7)?;
    let status: String = row.get(8)?;
    let payment_status: String = row.get(9)?;
    let expires_at: Option<String> = row.get(14)?;
    let reminder_sent_at: Option<String> = row.get(15)?;
    let created_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;

    Ok(Reservation {
        id: row.get(0)?,
        barber_id: row.get(1)?,
        service_id: row.get(2)?,
        client_name: row.get(3)?,
        client_email: row.get(4)?,
        client_phone: row.get(5)?,
        start_at: parse_dt(&start_at)?,
        end_at: parse_dt(&end_at)?,
        status: ReservationStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown reservation status: {status}"))?,
        payment_status: PaymentStatus::parse(&payment_status)
            .ok_or_else(|| anyhow::anyhow!("unknown payment status: {payment_status}"))?,
        payment_session_id: row.get(10)?,
        payment_ref: row.get(11)?,
        amount_paid: row.get(12)?,
        notes: row.get(13)?,
        expires_at: expires_at.as_deref().map(parse_dt).transpose()?,
        reminder_sent_at: reminder_sent_at.as_deref().map(parse_dt).transpose()?,
        created_at: parse_dt(&created_at)?,
        updated_at: parse_dt(&updated_at)?,
    })
}
