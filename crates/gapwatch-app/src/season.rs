// MLB season calendar used to decide when a daily report is due.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonSchedule {
    /// Default regular-season window: March 20 through September 30.
    pub fn for_year(year: i32) -> Self {
        // Both dates exist in every year chrono can represent.
        let start = NaiveDate::from_ymd_opt(year, 3, 20).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 9, 30).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Whether `date` falls inside the season (both ends inclusive).
    pub fn is_game_day(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Next day a report should go out, seen from `today`.
    ///
    /// Before the season this is opening day; during it, today; after it,
    /// `None`.
    pub fn next_game_day(&self, today: NaiveDate) -> Option<NaiveDate> {
        if today > self.end {
            None
        } else if today < self.start {
            Some(self.start)
        } else {
            Some(today)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn season_bounds_are_inclusive() {
        let s = SeasonSchedule::for_year(2024);
        assert!(s.is_game_day(d(3, 20)));
        assert!(s.is_game_day(d(9, 30)));
        assert!(!s.is_game_day(d(3, 19)));
        assert!(!s.is_game_day(d(10, 1)));
    }

    #[test]
    fn next_game_day_before_during_after() {
        let s = SeasonSchedule::for_year(2024);
        assert_eq!(s.next_game_day(d(1, 5)), Some(d(3, 20)));
        assert_eq!(s.next_game_day(d(6, 14)), Some(d(6, 14)));
        assert_eq!(s.next_game_day(d(9, 30)), Some(d(9, 30)));
        assert_eq!(s.next_game_day(d(11, 2)), None);
    }
}
