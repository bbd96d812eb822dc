// libs/scheduling-cell/src/services/availability.rs
use std::collections::HashSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::CalendarPolicy;

/// Compute the ordered bookable slot starts for `date`.
///
/// A slot is bookable when it is within policy for the weekday, not in
/// `taken` (slots held by pending or confirmed appointments), and - when
/// `date` is today in clinic local time - strictly after the current time.
/// Past dates and rest days yield an empty list; callers treat that as
/// "no availability", not as a failure.
pub fn available_slots(
    policy: &CalendarPolicy,
    date: NaiveDate,
    taken: &HashSet<NaiveTime>,
    now: DateTime<FixedOffset>,
) -> Vec<NaiveTime> {
    let today = now.date_naive();
    if date < today {
        return Vec::new();
    }

    let slots: Vec<NaiveTime> = policy
        .slots_for(date.weekday())
        .iter()
        .copied()
        .filter(|slot| !taken.contains(slot))
        .filter(|slot| date > today || *slot > now.time())
        .collect();

    debug!("{} bookable slots on {}", slots.len(), date);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(330 * 60).unwrap();
        offset
            .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
            .unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    // A Monday well in the future relative to nothing in particular.
    fn monday() -> NaiveDate {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(date.weekday(), Weekday::Mon);
        date
    }

    #[test]
    fn sunday_yields_no_slots() {
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(sunday.weekday(), Weekday::Sun);

        let slots = available_slots(
            &CalendarPolicy::default(),
            sunday,
            &HashSet::new(),
            at(monday(), 9, 0) - chrono::Duration::days(7),
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn full_day_when_nothing_is_taken() {
        let slots = available_slots(
            &CalendarPolicy::default(),
            monday(),
            &HashSet::new(),
            at(NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(), 9, 0),
        );
        assert_eq!(slots.len(), 14);
        assert_eq!(slots[0], time(10, 0));
    }

    #[test]
    fn taken_slots_are_excluded() {
        let taken: HashSet<NaiveTime> = [time(10, 0), time(16, 30)].into_iter().collect();
        let slots = available_slots(
            &CalendarPolicy::default(),
            monday(),
            &taken,
            at(NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(), 9, 0),
        );
        assert_eq!(slots.len(), 12);
        assert!(!slots.contains(&time(10, 0)));
        assert!(!slots.contains(&time(16, 30)));
    }

    #[test]
    fn today_keeps_only_future_slots() {
        // 11:05 local: morning slots up to 11:00 are gone, 11:30 onward remain.
        let slots = available_slots(
            &CalendarPolicy::default(),
            monday(),
            &HashSet::new(),
            at(monday(), 11, 5),
        );
        assert_eq!(slots.first().copied(), Some(time(11, 30)));
        assert_eq!(slots.len(), 11);
    }

    #[test]
    fn a_slot_start_equal_to_now_is_not_bookable() {
        let slots = available_slots(
            &CalendarPolicy::default(),
            monday(),
            &HashSet::new(),
            at(monday(), 12, 0),
        );
        assert!(!slots.contains(&time(12, 0)));
        assert_eq!(slots.first().copied(), Some(time(12, 30)));
    }

    #[test]
    fn past_dates_yield_no_slots() {
        let slots = available_slots(
            &CalendarPolicy::default(),
            monday(),
            &HashSet::new(),
            at(monday(), 10, 0) + chrono::Duration::days(1),
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let now = at(NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(), 9, 0);
        let taken: HashSet<NaiveTime> = [time(10, 30)].into_iter().collect();
        let first = available_slots(&CalendarPolicy::default(), monday(), &taken, now);
        let second = available_slots(&CalendarPolicy::default(), monday(), &taken, now);
        assert_eq!(first, second);
    }
}
