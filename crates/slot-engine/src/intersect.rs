//! Joint availability across practitioners who must attend together.

use crate::interval::{merge_intervals, TimeInterval, WeeklyAvailability};

/// Times at which every practitioner in `weeks` is free.
///
/// A day survives only if it is present for all practitioners and at least one
/// positive-length overlap remains after folding every practitioner in.
/// Zero practitioners yields an empty week.
pub fn intersect_weeks(weeks: &[WeeklyAvailability]) -> WeeklyAvailability {
    let Some((first, rest)) = weeks.split_first() else {
        return WeeklyAvailability::new();
    };

    let mut joint = first.clone();
    for week in rest {
        joint = intersect_pair(&joint, week);
        if joint.is_empty() {
            break;
        }
    }
    joint
}

fn intersect_pair(a: &WeeklyAvailability, b: &WeeklyAvailability) -> WeeklyAvailability {
    let mut joint = WeeklyAvailability::new();
    for (day, intervals) in a.iter() {
        let other = b.intervals(day);
        if other.is_empty() {
            continue;
        }
        joint.set(day, &intersect_intervals(intervals, other));
    }
    joint
}

/// Overlapping parts of two interval lists, via a two-pointer sweep.
///
/// Inputs are merged first, so they may be unsorted or overlap themselves.
pub fn intersect_intervals(a: &[TimeInterval], b: &[TimeInterval]) -> Vec<TimeInterval> {
    let a = merge_intervals(a);
    let b = merge_intervals(b);
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if let Some(overlap) = a[i].intersection(&b[j]) {
            out.push(overlap);
        }
        // Advance whichever interval finishes first; it cannot overlap anything later.
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }

    out
}
