// libs/scheduling-cell/src/models.rs
use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Weekly operating-hours policy: the ordered slot start times for each
/// weekday. A weekday with no slots is a rest day, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarPolicy {
    /// Indexed by day-of-week, 0 = Sunday through 6 = Saturday.
    slots: [Vec<NaiveTime>; 7],
    slot_minutes: i64,
}

impl CalendarPolicy {
    pub fn empty(slot_minutes: i64) -> Self {
        Self {
            slots: Default::default(),
            slot_minutes,
        }
    }

    /// Add a working window to the given weekdays. Slot starts are generated
    /// every `slot_minutes` from `open` while a full slot still fits before
    /// `close`.
    pub fn with_window(mut self, days: &[Weekday], open: NaiveTime, close: NaiveTime) -> Self {
        for day in days {
            let column = &mut self.slots[day_index(*day)];
            let mut start = open;
            while start + Duration::minutes(self.slot_minutes) <= close {
                column.push(start);
                start += Duration::minutes(self.slot_minutes);
            }
            column.sort();
            column.dedup();
        }
        self
    }

    pub fn slots_for(&self, day: Weekday) -> &[NaiveTime] {
        &self.slots[day_index(day)]
    }

    pub fn slot_minutes(&self) -> i64 {
        self.slot_minutes
    }

    pub fn is_valid_slot(&self, day: Weekday, time: NaiveTime) -> bool {
        self.slots_for(day).contains(&time)
    }
}

/// Clinic hours: Mon-Sat 10:00-13:00 and 16:00-20:00 in 30-minute slots,
/// Sundays closed.
impl Default for CalendarPolicy {
    fn default() -> Self {
        let working_days = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];
        Self::empty(30)
            .with_window(&working_days, hm(10, 0), hm(13, 0))
            .with_window(&working_days, hm(16, 0), hm(20, 0))
    }
}

fn day_index(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    // Both constants are in range; fall back to midnight rather than panic.
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_fourteen_weekday_slots() {
        let policy = CalendarPolicy::default();
        let monday = policy.slots_for(Weekday::Mon);
        assert_eq!(monday.len(), 14);
        assert_eq!(monday.first().copied(), NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(monday.last().copied(), NaiveTime::from_hms_opt(19, 30, 0));
        // 13:00 would overrun the morning window
        assert!(!policy.is_valid_slot(Weekday::Mon, NaiveTime::from_hms_opt(13, 0, 0).unwrap()));
    }

    #[test]
    fn default_policy_is_closed_on_sunday() {
        let policy = CalendarPolicy::default();
        assert!(policy.slots_for(Weekday::Sun).is_empty());
    }
}
