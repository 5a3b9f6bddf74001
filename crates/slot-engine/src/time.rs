//! Time window utilities: day-of-week bucketing, timezone conversion, and
//! instant arithmetic.
//!
//! All functions take the practice timezone explicitly. Nothing here reads the
//! system clock or the server's local timezone, so results are deterministic for
//! a given input.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::{resolve_local, DstPolicy};
use crate::error::{EngineError, Result};

/// Local datetime layouts accepted by [`to_utc`].
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A day of the week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All seven days in Monday-first order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Lowercase English name, e.g. `"monday"`.
    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    /// Day of the week a calendar date falls on.
    pub fn of_date(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == lower || d.as_str()[..3] == lower)
            .ok_or_else(|| EngineError::InvalidTimeFormat(format!("unknown day of week '{}'", s)))
    }
}

/// Map a UTC instant to the day of the week in the practice timezone.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slot_engine::time::{day_of_week, DayOfWeek};
///
/// // 03:00 UTC on Tuesday is still Monday evening in Los Angeles.
/// let instant = Utc.with_ymd_and_hms(2026, 3, 17, 3, 0, 0).unwrap();
/// let day = day_of_week(instant, chrono_tz::America::Los_Angeles);
/// assert_eq!(day, DayOfWeek::Monday);
/// ```
pub fn day_of_week(instant: DateTime<Utc>, tz: Tz) -> DayOfWeek {
    instant.with_timezone(&tz).weekday().into()
}

/// Convert a local datetime string in `tz` to a UTC instant.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD HH:MM[:SS]`. Ambiguous times
/// resolve to the earlier instant.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTimeFormat`] if the string cannot be parsed or names a
/// local time that does not exist in `tz` (a DST gap).
pub fn to_utc(local: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = parse_local(local)?;
    resolve_local(naive, tz, DstPolicy::Reject)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::InvalidTimeFormat(format!("'{}' does not exist in {}", local, tz.name()))
        })
}

/// Convert a UTC instant to the wall-clock datetime in `tz`.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Add (or with a negative value, subtract) whole minutes to an instant.
pub fn add_minutes(instant: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    instant + Duration::minutes(minutes)
}

/// Parse a local datetime string without attaching a timezone.
pub fn parse_local(s: &str) -> Result<NaiveDateTime> {
    let trimmed = s.trim();
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EngineError::InvalidTimeFormat(format!("'{}'", s)))
}

/// Parse an RFC 3339 datetime string into a UTC instant.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidTimeFormat(format!("'{}': {}", s, e)))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidTimeFormat(format!("'{}': {}", s, e)))
}

/// Parse an IANA timezone name into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// UTC bounds `[start, end)` of the local calendar day `date` in `tz`.
///
/// Zones that skip midnight on a DST change start the day at the first valid
/// local time instead.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_instant(date, NaiveTime::MIN, tz);
    let end = match date.succ_opt() {
        Some(next) => local_instant(next, NaiveTime::MIN, tz),
        None => start + Duration::days(1),
    };
    (start, end)
}

/// UTC instant of a local date and time, shifting forward out of DST gaps.
pub(crate) fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    resolve_local(naive, tz, DstPolicy::ShiftForward)
        .map(|dt| dt.with_timezone(&Utc))
        // A gap longer than a day does not occur in the tz database.
        .unwrap_or_else(|| naive.and_utc())
}
