//! Calendar-day keys and the date window rules.
//!
//! Every todo and journal entry lives in a bucket named by a [`DateKey`], the
//! canonical `YYYY-MM-DD` form of a local calendar day. The rules in this
//! module decide which days accept new content and which days still allow
//! todos to be toggled. They are pure functions of a reference day, so callers
//! obtain "today" once (normally via [`local_today`]) and pass it down.

use crate::constants::{DATE_FORMAT_ISO, DATE_KEY_LEN, FUTURE_DAYS, TOGGLE_GRACE_DAYS};
use crate::errors::DateKeyError;
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A local calendar day in canonical `YYYY-MM-DD` form.
///
/// Parsing is strict: the input must be exactly ten characters, zero-padded,
/// and name a real calendar day. Anything else is rejected with
/// [`DateKeyError::Malformed`] instead of being carried around as an invalid
/// date.
///
/// # Examples
///
/// ```
/// use daylog::dates::DateKey;
///
/// let key: DateKey = "2024-01-15".parse().unwrap();
/// assert_eq!(key.to_string(), "2024-01-15");
///
/// assert!("2024-1-15".parse::<DateKey>().is_err());
/// assert!("2024-02-30".parse::<DateKey>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wraps a calendar date.
    pub fn new(date: NaiveDate) -> Self {
        DateKey(date)
    }

    /// The calendar date this key names.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The key `days` calendar days after this one (negative goes back), or
    /// `None` if that falls outside the representable calendar.
    pub fn offset(&self, days: i64) -> Option<Self> {
        shift(self.0, days).map(DateKey)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey(date)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateKeyError::Malformed {
            input: s.to_string(),
        };

        // chrono accepts unpadded fields, so check the shape first
        let bytes = s.as_bytes();
        if bytes.len() != DATE_KEY_LEN || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(malformed());
        }
        if !bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
        {
            return Err(malformed());
        }

        NaiveDate::parse_from_str(s, DATE_FORMAT_ISO)
            .map(DateKey)
            .map_err(|_| malformed())
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT_ISO))
    }
}

/// Today's calendar date in the system's local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Key for today in the local timezone.
pub fn today_key() -> DateKey {
    DateKey(local_today())
}

/// Key for today plus `n` calendar days in the local timezone.
pub fn offset_key(n: i64) -> Option<DateKey> {
    offset_from(local_today(), n)
}

/// Key for `reference` plus `n` calendar days, or `None` if the result is
/// outside the representable calendar.
pub fn offset_from(reference: NaiveDate, n: i64) -> Option<DateKey> {
    shift(reference, n).map(DateKey)
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

/// The days content can be planned for: today, tomorrow and the day after.
///
/// ```
/// use daylog::dates::future_dates;
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
/// let keys: Vec<String> = future_dates(today).iter().map(|k| k.to_string()).collect();
/// assert_eq!(keys, vec!["2024-12-31", "2025-01-01", "2025-01-02"]);
/// ```
pub fn future_dates(today: NaiveDate) -> Vec<DateKey> {
    (0..FUTURE_DAYS)
        .filter_map(|n| offset_from(today, n))
        .collect()
}

/// True iff `key` is a calendar day strictly before `today`.
///
/// The comparison is between whole days, so the time of day never matters.
pub fn is_past(key: DateKey, today: NaiveDate) -> bool {
    key.0 < today
}

/// True iff `key` is strictly before `today - days`.
pub fn is_older_than(key: DateKey, days: i64, today: NaiveDate) -> bool {
    match days.checked_neg().and_then(|back| shift(today, back)) {
        Some(cutoff) => key.0 < cutoff,
        // The cutoff is off the calendar: before every day or after every day
        None => days < 0,
    }
}

/// Content may be added today or to future days, never to past days.
pub fn can_add_content(key: DateKey, today: NaiveDate) -> bool {
    !is_past(key, today)
}

/// Todos may be toggled on the day itself and for a grace window afterwards.
pub fn can_toggle(key: DateKey, today: NaiveDate) -> bool {
    !is_older_than(key, TOGGLE_GRACE_DAYS, today)
}

/// Human-readable day label, e.g. `Mon, Jan 15`.
pub fn format_date(key: DateKey) -> String {
    key.0.format("%a, %b %-d").to_string()
}

/// Local wall-clock time of a timestamp, e.g. `3:07 PM`.
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%-I:%M %p")
        .to_string()
}
