use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A client's claim on a barber's time. The core invariant: for a fixed
/// barber, no two blocking reservations (Confirmed, or Tentative whose
/// payment window has not expired) overlap as half-open [start, end)
/// intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub barber_id: String,
    pub service_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_session_id: Option<String>,
    pub payment_ref: Option<String>,
    pub amount_paid: Option<f64>,
    pub notes: Option<String>,
    /// Payment deadline while Tentative; past this instant the row no
    /// longer blocks the interval.
    pub expires_at: Option<NaiveDateTime>,
    pub reminder_sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Tentative,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Tentative => "tentative",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
            ReservationStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tentative" => Some(ReservationStatus::Tentative),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "completed" => Some(ReservationStatus::Completed),
            "no_show" => Some(ReservationStatus::NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed | ReservationStatus::NoShow
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            ReservationStatus::Tentative,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
            ReservationStatus::NoShow,
        ] {
            assert_eq!(ReservationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ReservationStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReservationStatus::Tentative.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Completed.is_terminal());
        assert!(ReservationStatus::NoShow.is_terminal());
    }
}
