//! Detect overlap between a candidate appointment and existing bookings.
//!
//! Intervals are half-open: a booking ending exactly when the candidate starts is
//! NOT a conflict. Location is deliberately ignored; a practitioner booked at one
//! location is busy at every location.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::model::{Booking, BookingId, CandidateSlot, PractitionerId};
use crate::time::{local_day_bounds, to_local};

/// An active booking that overlaps the candidate for one practitioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub booking_id: BookingId,
    pub practitioner_id: PractitionerId,
    pub overlap_minutes: i64,
}

/// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
///
/// This covers a candidate starting inside, ending inside, containing, or being
/// contained by an existing booking, and excludes touching boundaries.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// UTC span of the local calendar days the candidate touches.
fn day_window(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_day = to_local(start, tz).date();
    // `end` is exclusive, so a candidate ending at midnight stays on its own day.
    let last_day = to_local(end - Duration::nanoseconds(1), tz).date();
    (local_day_bounds(first_day, tz).0, local_day_bounds(last_day, tz).1)
}

/// Every active booking of `practitioner_id` that overlaps `[start, end)`.
///
/// Bookings are pre-filtered to the candidate's local day(s) in `tz`, then tested
/// exactly. Cancelled and no-show bookings never conflict. Results are ordered by
/// booking start time.
pub fn find_booking_conflicts(
    practitioner_id: &PractitionerId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bookings: &[Booking],
    tz: Tz,
) -> Vec<Conflict> {
    let (window_start, window_end) = day_window(start, end, tz);

    let mut hits: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.is_active() && b.involves(practitioner_id))
        .filter(|b| overlaps(b.start_time, b.end_time, window_start, window_end))
        .filter(|b| overlaps(start, end, b.start_time, b.end_time))
        .collect();
    hits.sort_by_key(|b| (b.start_time, b.id));

    hits.into_iter()
        .map(|b| {
            let overlap_start = start.max(b.start_time);
            let overlap_end = end.min(b.end_time);
            Conflict {
                booking_id: b.id,
                practitioner_id: practitioner_id.clone(),
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
            }
        })
        .collect()
}

/// Fail with [`EngineError::SlotConflict`] if `practitioner_id` is busy during `[start, end)`.
pub fn check_practitioner(
    practitioner_id: &PractitionerId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bookings: &[Booking],
    tz: Tz,
) -> Result<()> {
    let conflicts = find_booking_conflicts(practitioner_id, start, end, bookings, tz);
    into_result(conflicts)
}

/// Check every practitioner on the candidate. A conflict for any one of them fails
/// the whole candidate; there is no partial success.
pub fn check_candidate(candidate: &CandidateSlot, bookings: &[Booking], tz: Tz) -> Result<()> {
    let conflicts: Vec<Conflict> = candidate
        .practitioner_ids
        .iter()
        .flat_map(|p| {
            find_booking_conflicts(p, candidate.start_time, candidate.end_time, bookings, tz)
        })
        .collect();

    if !conflicts.is_empty() {
        warn!(
            candidate_start = %candidate.start_time,
            candidate_end = %candidate.end_time,
            conflicts = conflicts.len(),
            "candidate slot conflicts with existing bookings"
        );
    }
    into_result(conflicts)
}

fn into_result(conflicts: Vec<Conflict>) -> Result<()> {
    if conflicts.is_empty() {
        return Ok(());
    }
    // A joint booking shows up once per shared practitioner; report it once.
    let mut booking_ids: Vec<BookingId> = Vec::with_capacity(conflicts.len());
    for c in conflicts {
        if !booking_ids.contains(&c.booking_id) {
            booking_ids.push(c.booking_id);
        }
    }
    Err(EngineError::SlotConflict { booking_ids })
}
