use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Serialize, Serializer};

/// Date-time formats tried, in order, when no explicit format is configured.
const AUTO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only formats tried after the date-time ones. Slashed dates are
/// month-first; day-first input needs an explicit `date_format`.
const AUTO_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Canonical calendar date of a record.
///
/// Date-only values are held as midnight and render as `YYYY-MM-DD`; values
/// that carried a time of day keep it. Equality is exact, so `2024-01-01` and
/// `2024-01-01 09:30:00` are different join keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventDate(NaiveDateTime);

impl EventDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::default()))
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// Shorthand for building dates in code, `None` for an invalid day.
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn has_time(&self) -> bool {
        self.0.time() != NaiveTime::default()
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_time() {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        } else if self.0.nanosecond() == 0 {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.f"))
        }
    }
}

impl Serialize for EventDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Turns raw cell text into an [`EventDate`].
#[derive(Debug, Clone, Default)]
pub struct DateParser {
    format: Option<String>,
}

impl DateParser {
    /// `None` auto-detects among the common export formats.
    pub fn new(format: Option<String>) -> Self {
        Self { format }
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn parse(&self, raw: &str) -> Option<EventDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match &self.format {
            Some(format) => parse_with(format, raw),
            None => parse_auto(raw),
        }
    }
}

fn parse_with(format: &str, raw: &str) -> Option<EventDate> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(EventDate::from_datetime(dt));
    }
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .map(EventDate::from_date)
}

fn parse_auto(raw: &str) -> Option<EventDate> {
    // Offsets are dropped; the wall-clock time as written is the key.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(EventDate::from_datetime(dt.naive_local()));
    }
    for format in AUTO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(EventDate::from_datetime(dt));
        }
    }
    AUTO_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(EventDate::from_date)
}
