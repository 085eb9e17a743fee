pub mod stripe;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// What the core hands the provider after creating a Tentative reservation.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub reservation_id: String,
    pub client_email: String,
    pub client_name: String,
    pub service_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> anyhow::Result<CheckoutSession>;
}

/// Asynchronous provider events that drive reservation transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        reservation_id: String,
        payment_ref: String,
        amount_paid: f64,
    },
    CheckoutExpired {
        reservation_id: String,
    },
    ChargeRefunded {
        payment_ref: String,
    },
    /// Event types the core does not act on.
    Ignored,
}

/// Parse a provider webhook payload into a core event. Events without a
/// reservation id in their metadata are ignored rather than failed: the
/// provider also posts events for sessions we did not create.
pub fn parse_webhook_event(payload: &str) -> anyhow::Result<WebhookEvent> {
    let event: serde_json::Value = serde_json::from_str(payload)?;
    let kind = event["type"].as_str().unwrap_or("");
    let object = &event["data"]["object"];

    let reservation_id = object["metadata"]["reservation_id"]
        .as_str()
        .map(str::to_string);

    match kind {
        "checkout.session.completed" => {
            let Some(reservation_id) = reservation_id else {
                return Ok(WebhookEvent::Ignored);
            };
            let payment_ref = object["payment_intent"].as_str().unwrap_or("").to_string();
            let amount_paid = object["amount_total"].as_f64().unwrap_or(0.0) / 100.0;
            Ok(WebhookEvent::CheckoutCompleted {
                reservation_id,
                payment_ref,
                amount_paid,
            })
        }
        "checkout.session.expired" => match reservation_id {
            Some(reservation_id) => Ok(WebhookEvent::CheckoutExpired { reservation_id }),
            None => Ok(WebhookEvent::Ignored),
        },
        "charge.refunded" => {
            let payment_ref = object["payment_intent"].as_str().unwrap_or("");
            if payment_ref.is_empty() {
                return Ok(WebhookEvent::Ignored);
            }
            Ok(WebhookEvent::ChargeRefunded {
                payment_ref: payment_ref.to_string(),
            })
        }
        _ => Ok(WebhookEvent::Ignored),
    }
}

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `t=<unix>,v1=<hex hmac>` signature header over `"{t}.{payload}"`.
pub fn verify_signature(secret: &str, header: &str, payload: &str, now_unix: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    sign_payload(secret, timestamp, payload) == signature
}

pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completed_event() {
        let payload = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "payment_intent": "pi_123",
                "amount_total": 1550,
                "metadata": { "reservation_id": "res-1" }
            }}
        })
        .to_string();

        assert_eq!(
            parse_webhook_event(&payload).unwrap(),
            WebhookEvent::CheckoutCompleted {
                reservation_id: "res-1".to_string(),
                payment_ref: "pi_123".to_string(),
                amount_paid: 15.5,
            }
        );
    }

    #[test]
    fn test_parse_expired_event() {
        let payload = serde_json::json!({
            "type": "checkout.session.expired",
            "data": { "object": { "metadata": { "reservation_id": "res-2" } } }
        })
        .to_string();

        assert_eq!(
            parse_webhook_event(&payload).unwrap(),
            WebhookEvent::CheckoutExpired {
                reservation_id: "res-2".to_string()
            }
        );
    }

    #[test]
    fn test_foreign_and_unknown_events_ignored() {
        let no_metadata = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {} }
        })
        .to_string();
        assert_eq!(parse_webhook_event(&no_metadata).unwrap(), WebhookEvent::Ignored);

        let unknown = serde_json::json!({ "type": "invoice.created", "data": { "object": {} } })
            .to_string();
        assert_eq!(parse_webhook_event(&unknown).unwrap(), WebhookEvent::Ignored);
    }

    #[test]
    fn test_signature_round_trip() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let signed = sign_payload("whsec_test", 1_700_000_000, payload);
        let header = format!("t=1700000000,v1={signed}");

        assert!(verify_signature("whsec_test", &header, payload, 1_700_000_060));
        assert!(!verify_signature("whsec_other", &header, payload, 1_700_000_060));
        assert!(!verify_signature("whsec_test", &header, "tampered", 1_700_000_060));
    }

    #[test]
    fn test_signature_outside_tolerance() {
        let payload = "{}";
        let signed = sign_payload("whsec_test", 1_700_000_000, payload);
        let header = format!("t=1700000000,v1={signed}");

        assert!(!verify_signature("whsec_test", &header, payload, 1_700_000_000 + 301));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(!verify_signature("whsec_test", "", "{}", 0));
        assert!(!verify_signature("whsec_test", "t=abc,v1=00", "{}", 0));
    }
}
