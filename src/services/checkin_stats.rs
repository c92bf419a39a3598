//! # Check-in statistics
//!
//! Aggregates are never stored. Every figure here is derived from the user's
//! check-in history on request:
//!
//! - monthly/overall tallies partition records by kind
//! - the current streak walks backwards from today (or yesterday, if today
//!   has no record yet) one calendar day at a time until the first gap
//! - the longest streak is the longest run of consecutive recorded days
//!
//! Any kind of record counts as a checked-in day for streak purposes.
//!
//! Dates are the "YYYY-MM-DD" strings stored on the records, so a month can be
//! selected with a plain lexicographic range.

use std::collections::HashSet;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::checkin::{CheckInKind, CheckInRecord};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Server-local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Inclusive lexicographic window `[YYYY-MM-01, YYYY-MM-31]`.
///
/// The upper bound is always day 31; shorter months simply have no records
/// past their last real day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    start: String,
    end: String,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation("Month must be between 1 and 12".into()));
        }
        if !(1..=9999).contains(&year) {
            return Err(AppError::Validation("Year must be between 1 and 9999".into()));
        }
        Ok(Self {
            year,
            month,
            start: format!("{year:04}-{month:02}-01"),
            end: format!("{year:04}-{month:02}-31"),
        })
    }

    pub fn containing(date: NaiveDate) -> Self {
        let (year, month) = (date.year(), date.month());
        Self {
            year,
            month,
            start: format!("{year:04}-{month:02}-01"),
            end: format!("{year:04}-{month:02}-31"),
        }
    }

    /// Missing parts default to the month containing `today`.
    pub fn resolve(year: Option<i32>, month: Option<u32>, today: NaiveDate) -> AppResult<Self> {
        Self::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()))
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn contains(&self, date: &str) -> bool {
        date >= self.start.as_str() && date <= self.end.as_str()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total: u32,
    pub completed_count: u32,
    pub incomplete_count: u32,
}

impl Tally {
    pub fn of<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = CheckInKind>,
    {
        kinds.into_iter().fold(Self::default(), |mut tally, kind| {
            tally.total += 1;
            match kind {
                CheckInKind::Completed => tally.completed_count += 1,
                CheckInKind::Incomplete => tally.incomplete_count += 1,
            }
            tally
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCheckIns {
    pub year: i32,
    pub month: u32,
    pub records: Vec<CheckInRecord>,
    #[serde(flatten)]
    pub tally: Tally,
}

impl MonthlyCheckIns {
    /// `records` must already be restricted to the window.
    pub fn new(window: &MonthWindow, mut records: Vec<CheckInRecord>) -> Self {
        records.sort_by(|a, b| a.date.cmp(&b.date));
        let tally = Tally::of(records.iter().map(|r| r.kind));
        Self {
            year: window.year,
            month: window.month,
            records,
            tally,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStats {
    pub monthly: Tally,
    pub overall: Tally,
    pub streak: u32,
    pub longest_streak: u32,
}

/// Derives all statistics from a user's full history as of `today`.
pub fn compute_stats(records: &[CheckInRecord], today: NaiveDate) -> CheckInStats {
    let window = MonthWindow::containing(today);
    let monthly = Tally::of(
        records
            .iter()
            .filter(|r| window.contains(&r.date))
            .map(|r| r.kind),
    );
    let overall = Tally::of(records.iter().map(|r| r.kind));

    let dates: HashSet<&str> = records.iter().map(|r| r.date.as_str()).collect();

    CheckInStats {
        monthly,
        overall,
        streak: current_streak(&dates, today),
        longest_streak: longest_streak(&dates),
    }
}

/// Consecutive checked-in days ending today, or ending yesterday when today
/// has not been recorded yet.
pub fn current_streak(dates: &HashSet<&str>, today: NaiveDate) -> u32 {
    let has = |d: NaiveDate| dates.contains(format_date(d).as_str());

    let mut cursor = if has(today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if has(yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while has(cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive calendar days anywhere in the history.
/// Unparseable dates are ignored.
pub fn longest_streak(dates: &HashSet<&str>) -> u32 {
    let mut days: Vec<NaiveDate> = dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
        .collect();
    days.sort_unstable();

    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn record(date: &str, kind: CheckInKind) -> CheckInRecord {
        CheckInRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date: date.to_string(),
            kind,
            is_completed: kind.is_completed(),
            incomplete_tasks: Json(Vec::new()),
            note: String::new(),
            created_at: Utc::now(),
        }
    }

    fn set<'a>(dates: &[&'a str]) -> HashSet<&'a str> {
        dates.iter().copied().collect()
    }

    #[test]
    fn test_streak_contiguous_run_ending_today() {
        let dates = set(&["2024-01-10", "2024-01-11", "2024-01-12"]);
        assert_eq!(current_streak(&dates, day("2024-01-12")), 3);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let dates = set(&["2024-01-10", "2024-01-12"]);
        assert_eq!(current_streak(&dates, day("2024-01-12")), 1);
    }

    #[test]
    fn test_streak_continues_through_yesterday() {
        let dates = set(&["2024-01-10", "2024-01-11"]);
        assert_eq!(current_streak(&dates, day("2024-01-12")), 2);
    }

    #[test]
    fn test_streak_zero_without_today_or_yesterday() {
        let dates = set(&["2024-01-09", "2024-01-10"]);
        assert_eq!(current_streak(&dates, day("2024-01-12")), 0);
        assert_eq!(current_streak(&HashSet::new(), day("2024-01-12")), 0);
    }

    #[test]
    fn test_streak_crosses_month_and_year_boundaries() {
        let dates = set(&["2023-12-30", "2023-12-31", "2024-01-01", "2024-01-02"]);
        assert_eq!(current_streak(&dates, day("2024-01-02")), 4);

        let dates = set(&["2024-02-28", "2024-02-29", "2024-03-01"]);
        assert_eq!(current_streak(&dates, day("2024-03-01")), 3);
    }

    #[test]
    fn test_streak_ignores_future_records() {
        let dates = set(&["2024-01-11", "2024-01-12", "2024-01-13"]);
        assert_eq!(current_streak(&dates, day("2024-01-12")), 2);
    }

    #[test]
    fn test_longest_streak() {
        let dates = set(&[
            "2024-01-01",
            "2024-01-02",
            "2024-01-03",
            "2024-01-04",
            "2024-01-08",
            "2024-01-09",
        ]);
        assert_eq!(longest_streak(&dates), 4);
        assert_eq!(longest_streak(&HashSet::new()), 0);
        assert_eq!(longest_streak(&set(&["2024-01-01", "not-a-date"])), 1);
    }

    #[test]
    fn test_month_window_bounds() {
        let window = MonthWindow::new(2024, 2).unwrap();
        assert_eq!(window.start(), "2024-02-01");
        assert_eq!(window.end(), "2024-02-31");
        assert!(window.contains("2024-02-01"));
        assert!(window.contains("2024-02-29"));
        assert!(!window.contains("2024-01-31"));
        assert!(!window.contains("2024-03-01"));
    }

    #[test]
    fn test_month_window_rejects_bad_month() {
        assert!(MonthWindow::new(2024, 0).is_err());
        assert!(MonthWindow::new(2024, 13).is_err());
    }

    #[test]
    fn test_month_window_resolve_defaults() {
        let window = MonthWindow::resolve(None, None, day("2024-07-15")).unwrap();
        assert_eq!((window.year, window.month), (2024, 7));

        let window = MonthWindow::resolve(Some(2023), None, day("2024-07-15")).unwrap();
        assert_eq!(window.start(), "2023-07-01");
    }

    #[test]
    fn test_monthly_check_ins_sorted_with_counts() {
        let window = MonthWindow::new(2024, 2).unwrap();
        let monthly = MonthlyCheckIns::new(
            &window,
            vec![
                record("2024-02-10", CheckInKind::Incomplete),
                record("2024-02-01", CheckInKind::Completed),
                record("2024-02-05", CheckInKind::Completed),
            ],
        );

        let dates: Vec<_> = monthly.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-02-01", "2024-02-05", "2024-02-10"]);
        assert_eq!(
            monthly.tally,
            Tally {
                total: 3,
                completed_count: 2,
                incomplete_count: 1
            }
        );
    }

    #[test]
    fn test_compute_stats_empty_history() {
        let stats = compute_stats(&[], day("2024-01-12"));
        assert_eq!(stats.monthly, Tally::default());
        assert_eq!(stats.overall, Tally::default());
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.longest_streak, 0);
    }

    #[test]
    fn test_compute_stats_mixed_history() {
        let records = vec![
            record("2024-01-12", CheckInKind::Incomplete),
            record("2024-01-11", CheckInKind::Completed),
            record("2024-01-10", CheckInKind::Completed),
            record("2023-12-31", CheckInKind::Completed),
            record("2023-12-30", CheckInKind::Incomplete),
        ];

        let stats = compute_stats(&records, day("2024-01-12"));
        assert_eq!(
            stats.monthly,
            Tally {
                total: 3,
                completed_count: 2,
                incomplete_count: 1
            }
        );
        assert_eq!(
            stats.overall,
            Tally {
                total: 5,
                completed_count: 3,
                incomplete_count: 2
            }
        );
        assert_eq!(stats.streak, 3);
        assert_eq!(stats.longest_streak, 3);
    }
}
