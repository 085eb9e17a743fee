use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::Slot;

/// Candidate starts fall on a fixed grid, independent of service duration:
/// a 45-minute service still starts only on 30-minute boundaries.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// Generate every candidate slot for one barber/day, in chronological order.
///
/// Candidates run from `open` in 30-minute steps; the last one must fit
/// entirely inside the working window (`start + duration <= close`), so a
/// duration longer than the window yields nothing. Every candidate is
/// emitted, flagged unavailable when it overlaps an occupied [start, end)
/// interval or starts strictly before `now`, so callers can distinguish
/// "taken" from "closed".
///
/// Pure and deterministic: identical inputs give identical output.
pub fn generate_slots(
    date: NaiveDate,
    open: NaiveTime,
    close: NaiveTime,
    duration_minutes: i64,
    occupied: &[(NaiveDateTime, NaiveDateTime)],
    now: NaiveDateTime,
) -> Vec<Slot> {
    let window_end = date.and_time(close);
    let duration = Duration::minutes(duration_minutes);

    let mut slots = vec![];
    let mut start = date.and_time(open);

    while start + duration <= window_end {
        let end = start + duration;

        // Half-open overlap: a slot ending exactly where a reservation
        // begins does not collide.
        let has_conflict = occupied
            .iter()
            .any(|(occ_start, occ_end)| start < *occ_end && end > *occ_start);
        let is_past = start < now;

        slots.push(Slot {
            start_at: start,
            end_at: end,
            available: !has_conflict && !is_past,
        });

        start += Duration::minutes(SLOT_INTERVAL_MINUTES);
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn early() -> NaiveDateTime {
        dt("2025-06-16 00:00")
    }

    #[test]
    fn test_full_day_45_minute_service() {
        let slots = generate_slots(date(), time("09:00"), time("20:00"), 45, &[], early());

        assert_eq!(slots.first().unwrap().start_at, dt("2025-06-16 09:00"));
        assert_eq!(slots.first().unwrap().end_at, dt("2025-06-16 09:45"));
        // 19:15 + 45 = 20:00 is the last start that still fits
        assert_eq!(slots.last().unwrap().start_at, dt("2025-06-16 19:15"));
        assert_eq!(slots.len(), 21);
        assert!(slots.iter().all(|s| s.available));

        // 30-minute grid throughout
        for pair in slots.windows(2) {
            assert_eq!(pair[1].start_at - pair[0].start_at, Duration::minutes(30));
        }
    }

    #[test]
    fn test_no_slot_overruns_window() {
        for duration in [15, 30, 40, 45, 60, 90] {
            let slots = generate_slots(date(), time("09:00"), time("17:00"), duration, &[], early());
            let window_end = dt("2025-06-16 17:00");
            assert!(slots.iter().all(|s| s.end_at <= window_end));
            // The following grid point would overrun, so the emitted tail is maximal
            if let Some(last) = slots.last() {
                assert!(last.start_at + Duration::minutes(30 + duration) > window_end);
            }
        }
    }

    #[test]
    fn test_duration_longer_than_window() {
        let slots = generate_slots(date(), time("09:00"), time("10:00"), 90, &[], early());
        assert!(slots.is_empty());
    }

    #[test]
    fn test_occupied_interval_marks_overlapping_slots() {
        // Existing reservation 10:00-10:45, 30-minute service
        let occupied = vec![(dt("2025-06-16 10:00"), dt("2025-06-16 10:45"))];
        let slots = generate_slots(date(), time("09:00"), time("20:00"), 30, &occupied, early());

        let availability: std::collections::HashMap<_, _> =
            slots.iter().map(|s| (s.start_at, s.available)).collect();

        assert!(availability[&dt("2025-06-16 09:30")]);
        // 09:45 is not on the 30-minute grid; 10:00 overlaps outright
        assert!(!availability[&dt("2025-06-16 10:00")]);
        assert!(availability[&dt("2025-06-16 11:00")]);
    }

    #[test]
    fn test_occupied_interval_with_15_minute_grid_offsets() {
        // Grid anchored at a non-hour opening time, with a 45-minute
        // reservation that several candidates cross into.
        let occupied = vec![(dt("2025-06-16 10:00"), dt("2025-06-16 10:45"))];
        let slots = generate_slots(date(), time("09:45"), time("20:00"), 45, &occupied, early());

        // 09:45-10:30 overlaps 10:00-10:45
        assert_eq!(slots[0].start_at, dt("2025-06-16 09:45"));
        assert!(!slots[0].available);
        // 10:15-11:00 overlaps as well
        assert_eq!(slots[1].start_at, dt("2025-06-16 10:15"));
        assert!(!slots[1].available);
        // 10:45-11:30 starts exactly at the occupied end: free (half-open)
        assert_eq!(slots[2].start_at, dt("2025-06-16 10:45"));
        assert!(slots[2].available);
    }

    #[test]
    fn test_adjacent_reservation_does_not_block() {
        let occupied = vec![(dt("2025-06-16 10:00"), dt("2025-06-16 10:30"))];
        let slots = generate_slots(date(), time("09:00"), time("12:00"), 30, &occupied, early());

        let availability: std::collections::HashMap<_, _> =
            slots.iter().map(|s| (s.start_at, s.available)).collect();

        // Ends exactly at 10:00, no overlap
        assert!(availability[&dt("2025-06-16 09:30")]);
        assert!(!availability[&dt("2025-06-16 10:00")]);
        // Starts exactly at 10:30, no overlap
        assert!(availability[&dt("2025-06-16 10:30")]);
    }

    #[test]
    fn test_past_slots_unavailable() {
        let now = dt("2025-06-16 11:10");
        let slots = generate_slots(date(), time("09:00"), time("14:00"), 30, &[], now);

        for slot in &slots {
            assert_eq!(slot.available, slot.start_at >= now, "slot {}", slot.start_at);
        }
        // 11:30 is the first future slot
        assert!(slots
            .iter()
            .find(|s| s.start_at == dt("2025-06-16 11:30"))
            .unwrap()
            .available);
    }

    #[test]
    fn test_deterministic() {
        let occupied = vec![(dt("2025-06-16 10:00"), dt("2025-06-16 11:00"))];
        let a = generate_slots(date(), time("09:00"), time("18:00"), 45, &occupied, early());
        let b = generate_slots(date(), time("09:00"), time("18:00"), 45, &occupied, early());
        assert_eq!(a, b);
    }
}
