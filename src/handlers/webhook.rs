use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;

use crate::db::queries;
use crate::services::booking;
use crate::services::notifications;
use crate::services::payments::{self, WebhookEvent};
use crate::state::AppState;

// POST /webhook/payments
//
// The payment provider is the source of truth for payment outcomes; its
// events drive the Tentative -> Confirmed / Cancelled transitions. The raw
// body is needed for signature verification, so this route takes the body
// as text rather than parsed JSON.
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Verify authenticity (skip if secret is unset, dev mode)
    if !state.config.stripe_webhook_secret.is_empty() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !payments::verify_signature(
            &state.config.stripe_webhook_secret,
            signature,
            &body,
            chrono::Utc::now().timestamp(),
        ) {
            tracing::warn!("invalid payment webhook signature");
            return (StatusCode::FORBIDDEN, "invalid signature").into_response();
        }
    }

    let event = match payments::parse_webhook_event(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "malformed payment webhook payload");
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    let now = Local::now().naive_local();

    match event {
        WebhookEvent::CheckoutCompleted {
            reservation_id,
            payment_ref,
            amount_paid,
        } => {
            let confirmed = {
                let db = state.db.lock().unwrap();
                match booking::confirm_payment(&db, &reservation_id, &payment_ref, amount_paid, now)
                {
                    Ok(reservation) => {
                        let barber = queries::get_barber(&db, &reservation.barber_id)
                            .ok()
                            .flatten()
                            .map(|b| b.name)
                            .unwrap_or_default();
                        let service = queries::get_service(&db, &reservation.service_id)
                            .ok()
                            .flatten()
                            .map(|s| s.name)
                            .unwrap_or_default();
                        Some((reservation, barber, service))
                    }
                    Err(e) => {
                        // Stale or unknown event: acknowledge it anyway so the
                        // provider stops retrying, the state did not change.
                        tracing::warn!(error = %e, reservation_id = %reservation_id, "ignoring payment success event");
                        None
                    }
                }
            };

            if let Some((reservation, barber_name, service_name)) = confirmed {
                notifications::send_confirmation(
                    state.notifier.as_ref(),
                    &state.config.business_name,
                    &reservation,
                    &barber_name,
                    &service_name,
                )
                .await;
            }
        }
        WebhookEvent::CheckoutExpired { reservation_id } => {
            let db = state.db.lock().unwrap();
            match booking::payment_failed(&db, &reservation_id, now) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(reservation_id = %reservation_id, "expiry event for a non-tentative reservation")
                }
                Err(e) => tracing::error!(error = %e, reservation_id = %reservation_id, "failed to release reservation"),
            }
        }
        WebhookEvent::ChargeRefunded { payment_ref } => {
            let db = state.db.lock().unwrap();
            match queries::mark_refunded(&db, &payment_ref, &now) {
                Ok(count) => tracing::info!(payment_ref = %payment_ref, count, "marked refunded"),
                Err(e) => tracing::error!(error = %e, payment_ref = %payment_ref, "failed to mark refund"),
            }
        }
        WebhookEvent::Ignored => {}
    }

    Json(serde_json::json!({ "received": true })).into_response()
}
