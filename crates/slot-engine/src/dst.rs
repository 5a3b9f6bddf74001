//! DST transition policies for local wall-clock times.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Policy for local times that fall into a DST gap (e.g. 02:30 during spring forward).
///
/// Ambiguous times (the repeated hour when clocks fall back) always resolve to the
/// earliest instant, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Treat a nonexistent local time as invalid input.
    #[default]
    Reject,
    /// Drop the nonexistent time silently.
    Skip,
    /// Move to the first valid local time after the gap.
    ShiftForward,
}

/// Resolve a local wall-clock time in `tz` according to `policy`.
///
/// Returns `None` when the time is nonexistent and the policy is `Reject` or `Skip`;
/// callers decide whether that is an error.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Tz>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt);
    }

    match policy {
        DstPolicy::Reject | DstPolicy::Skip => None,
        DstPolicy::ShiftForward => {
            // Gaps are at most a couple of hours; walk forward a minute at a time.
            (1..=24 * 60).find_map(|m| {
                tz.from_local_datetime(&(naive + Duration::minutes(m)))
                    .earliest()
            })
        }
    }
}
