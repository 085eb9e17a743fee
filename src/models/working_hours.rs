use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// One row per (barber, weekday). Weekdays are 0-6 with Sunday = 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub barber_id: String,
    pub weekday: u8,
    pub start_time: String,
    pub end_time: String,
    pub active: bool,
}

impl WorkingHours {
    pub fn open(&self) -> anyhow::Result<NaiveTime> {
        parse_time(&self.start_time)
    }

    pub fn close(&self) -> anyhow::Result<NaiveTime> {
        parse_time(&self.end_time)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.weekday > 6 {
            anyhow::bail!("weekday out of range: {}", self.weekday);
        }
        let open = self.open()?;
        let close = self.close()?;
        if self.active && open >= close {
            anyhow::bail!("start time must be before end time: {} >= {}", self.start_time, self.end_time);
        }
        Ok(())
    }
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| anyhow::anyhow!("invalid time format: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(weekday: u8, start: &str, end: &str, active: bool) -> WorkingHours {
        WorkingHours {
            barber_id: "b1".to_string(),
            weekday,
            start_time: start.to_string(),
            end_time: end.to_string(),
            active,
        }
    }

    #[test]
    fn test_valid_hours() {
        assert!(hours(1, "09:00", "20:00", true).validate().is_ok());
    }

    #[test]
    fn test_start_after_end_rejected_when_active() {
        assert!(hours(1, "20:00", "09:00", true).validate().is_err());
        // Inactive rows are not checked for ordering
        assert!(hours(1, "20:00", "09:00", false).validate().is_ok());
    }

    #[test]
    fn test_bad_weekday() {
        assert!(hours(7, "09:00", "17:00", true).validate().is_err());
    }

    #[test]
    fn test_bad_time_format() {
        assert!(hours(1, "25:00", "17:00", true).validate().is_err());
        assert!(hours(1, "9am", "17:00", true).validate().is_err());
    }
}
