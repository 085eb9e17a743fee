use chrono::NaiveDateTime;
use serde::Serialize;

/// A candidate bookable start time. Derived on every query, never stored:
/// availability depends on the live reservation set and the current time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub available: bool,
}
