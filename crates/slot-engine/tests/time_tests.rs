//! Tests for day-of-week bucketing and timezone conversion.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::America::{Los_Angeles, New_York};
use chrono_tz::UTC;
use slot_engine::time::{
    add_minutes, day_of_week, local_day_bounds, parse_instant, parse_local, parse_timezone,
    to_local, to_utc, week_start, DayOfWeek,
};
use slot_engine::EngineError;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── day_of_week ─────────────────────────────────────────────────────────────

#[test]
fn day_of_week_uses_practice_timezone_not_utc() {
    // 03:00 UTC Tuesday = 20:00 PDT Monday
    let instant = Utc.with_ymd_and_hms(2026, 3, 17, 3, 0, 0).unwrap();
    assert_eq!(day_of_week(instant, UTC), DayOfWeek::Tuesday);
    assert_eq!(day_of_week(instant, Los_Angeles), DayOfWeek::Monday);
}

#[test]
fn day_of_week_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&DayOfWeek::Wednesday).unwrap(), "\"wednesday\"");
    let parsed: DayOfWeek = serde_json::from_str("\"sunday\"").unwrap();
    assert_eq!(parsed, DayOfWeek::Sunday);
}

#[test]
fn day_of_week_parses_full_and_short_names() {
    assert_eq!("Monday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
    assert_eq!("fri".parse::<DayOfWeek>().unwrap(), DayOfWeek::Friday);
    assert!("funday".parse::<DayOfWeek>().is_err());
}

#[test]
fn days_order_monday_first() {
    assert!(DayOfWeek::Monday < DayOfWeek::Sunday);
    assert_eq!(DayOfWeek::of_date(date(2026, 3, 16)), DayOfWeek::Monday);
}

// ── to_utc / to_local ───────────────────────────────────────────────────────

#[test]
fn to_utc_applies_dst_offset() {
    // March 16 2026 is EDT (UTC-4)
    let utc = to_utc("2026-03-16 10:00", New_York).unwrap();
    assert_eq!(utc, Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap());

    // January is EST (UTC-5)
    let utc = to_utc("2026-01-12T10:00:00", New_York).unwrap();
    assert_eq!(utc, Utc.with_ymd_and_hms(2026, 1, 12, 15, 0, 0).unwrap());
}

#[test]
fn to_utc_and_to_local_round_trip_to_the_second() {
    let local = "2026-07-04T09:15:42";
    let utc = to_utc(local, Los_Angeles).unwrap();
    assert_eq!(to_local(utc, Los_Angeles), parse_local(local).unwrap());
}

#[test]
fn to_utc_rejects_garbage() {
    let err = to_utc("16/03/2026 10am", New_York).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimeFormat(_)));
    assert!(to_utc("", New_York).is_err());
}

#[test]
fn to_utc_rejects_time_in_dst_gap() {
    // 02:30 does not exist in New York on 2026-03-08
    let err = to_utc("2026-03-08 02:30", New_York).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimeFormat(_)));
}

#[test]
fn to_utc_resolves_ambiguous_time_to_earliest() {
    // 01:30 happens twice on 2026-11-01; the first is EDT (UTC-4)
    let utc = to_utc("2026-11-01 01:30", New_York).unwrap();
    assert_eq!(utc, Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap());
}

// ── Misc helpers ────────────────────────────────────────────────────────────

#[test]
fn add_minutes_derives_end_time() {
    let start = Utc.with_ymd_and_hms(2026, 3, 16, 23, 45, 0).unwrap();
    assert_eq!(add_minutes(start, 30), Utc.with_ymd_and_hms(2026, 3, 17, 0, 15, 0).unwrap());
    assert_eq!(add_minutes(start, -45), Utc.with_ymd_and_hms(2026, 3, 16, 23, 0, 0).unwrap());
}

#[test]
fn parse_instant_accepts_rfc3339_only() {
    let instant = parse_instant("2026-03-16T10:00:00+02:00").unwrap();
    assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 16, 8, 0, 0).unwrap());
    assert!(matches!(
        parse_instant("2026-03-16 10:00").unwrap_err(),
        EngineError::InvalidTimeFormat(_)
    ));
}

#[test]
fn parse_timezone_rejects_unknown_names() {
    assert!(parse_timezone("Europe/Dublin").is_ok());
    assert!(matches!(
        parse_timezone("Mars/Olympus_Mons").unwrap_err(),
        EngineError::InvalidTimezone(_)
    ));
}

#[test]
fn week_start_is_monday() {
    assert_eq!(week_start(date(2026, 3, 19)), date(2026, 3, 16));
    assert_eq!(week_start(date(2026, 3, 16)), date(2026, 3, 16));
    assert_eq!(week_start(date(2026, 3, 22)), date(2026, 3, 16));
}

#[test]
fn local_day_bounds_cover_short_dst_day() {
    // Spring forward: the local day is 23 hours long
    let (start, end) = local_day_bounds(date(2026, 3, 8), New_York);
    assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 8, 5, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 9, 4, 0, 0).unwrap());
    assert_eq!((end - start).num_hours(), 23);
}
