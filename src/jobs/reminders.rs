use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDateTime};

use crate::db::queries;
use crate::models::Reservation;
use crate::services::notifications;
use crate::state::AppState;

/// Periodic maintenance, outside the booking core: release stale payment
/// holds and send next-day reminders. Purely consumes the core's read
/// interface; booking invariants never depend on this task running.
pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(async move {
        // First pass shortly after startup so a restart does not skip a window
        let mut interval = tokio::time::interval(StdDuration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = run_once(&state).await {
                tracing::error!(error = %e, "reminder sweep failed");
            }
        }
    });
}

pub async fn run_once(state: &Arc<AppState>) -> anyhow::Result<()> {
    let now = Local::now().naive_local();

    release_expired_holds(state, &now)?;
    send_due_reminders(state, &now).await
}

fn release_expired_holds(state: &Arc<AppState>, now: &NaiveDateTime) -> anyhow::Result<()> {
    let db = state.db.lock().unwrap();
    let released = queries::cancel_expired_tentative(&db, now)?;
    if released > 0 {
        tracing::info!(released, "cancelled expired tentative reservations");
    }
    Ok(())
}

async fn send_due_reminders(state: &Arc<AppState>, now: &NaiveDateTime) -> anyhow::Result<()> {
    // Reservations starting 23-25h out; the overlap between hourly runs
    // is what mark_reminder_sent deduplicates.
    let window_start = *now + Duration::hours(23);
    let window_end = *now + Duration::hours(25);

    let due: Vec<(Reservation, String)> = {
        let db = state.db.lock().unwrap();
        let pending = queries::reservations_needing_reminder(&db, &window_start, &window_end)?;
        pending
            .into_iter()
            .map(|r| {
                let barber_name = queries::get_barber(&db, &r.barber_id)?
                    .map(|b| b.name)
                    .unwrap_or_else(|| "your barber".to_string());
                Ok((r, barber_name))
            })
            .collect::<anyhow::Result<_>>()?
    };

    if due.is_empty() {
        return Ok(());
    }
    tracing::info!(count = due.len(), "sending booking reminders");

    for (reservation, barber_name) in due {
        match notifications::send_reminder(
            state.notifier.as_ref(),
            &state.config.business_name,
            &reservation,
            &barber_name,
        )
        .await
        {
            Ok(()) => {
                let db = state.db.lock().unwrap();
                queries::mark_reminder_sent(&db, &reservation.id, now)?;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reservation_id = %reservation.id,
                    "failed to send reminder, will retry next run"
                );
            }
        }
    }

    Ok(())
}
