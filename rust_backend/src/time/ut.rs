use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OmpError, OmpResult};

/// Parse a UT date given as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_ut_date(input: &str) -> OmpResult<NaiveDate> {
    let trimmed = input.trim();
    let compact = trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit());
    let parsed = if compact {
        NaiveDate::parse_from_str(trimmed, "%Y%m%d").ok()
    } else {
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
    };
    parsed.ok_or_else(|| OmpError::bad_args(format!("Unable to parse UT date '{}'", input)))
}

pub fn today_ut() -> NaiveDate {
    Utc::now().date_naive()
}

/// A run of whole UT days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UtRangeFields")]
pub struct UtRange {
    pub start: NaiveDate,
    pub days: u32,
}

#[derive(Deserialize)]
struct UtRangeFields {
    start: NaiveDate,
    days: u32,
}

impl From<UtRangeFields> for UtRange {
    fn from(fields: UtRangeFields) -> Self {
        UtRange::new(fields.start, fields.days)
    }
}

impl UtRange {
    /// Range of `days` days; zero is treated as a single day.
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            days: days.max(1),
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, 1)
    }

    /// Last date in the range (inclusive). A zero-day range ends on `start`.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(u64::from(self.days).saturating_sub(1)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains_date(&self, date: &NaiveDate) -> bool {
        self.start <= *date && *date <= self.end()
    }

    /// Whether `instant` falls on one of the range's UT days.
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.contains_date(&instant.date_naive())
    }

    /// Midnight UT on the first day.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Midnight UT following the last day (exclusive bound).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end()
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.days as usize)
    }
}
