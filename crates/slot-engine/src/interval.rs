//! Half-open wall-clock intervals and the arithmetic the engine needs on them.
//!
//! Intervals are `[start, end)`: an interval ending at 10:30 and one starting at
//! 10:30 touch but do not overlap.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::DayOfWeek;

/// A half-open `[start, end)` range of local wall-clock time within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    /// Build an interval, rejecting empty or inverted ranges.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidInterval(format!(
                "start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Convenience constructor from whole hours and minutes.
    pub fn hm(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> Result<Self> {
        let start = hm_time(start_hour, start_min)?;
        let end = hm_time(end_hour, end_min)?;
        Self::new(start, end)
    }

    /// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The overlapping part of two intervals, or `None` when it would be empty.
    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeInterval { start, end })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

fn hm_time(hour: u32, min: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour, min, 0)
        .ok_or_else(|| EngineError::InvalidTimeFormat(format!("{:02}:{:02}", hour, min)))
}

/// Sort intervals and coalesce overlapping or adjacent ones.
///
/// Returns a sorted, non-overlapping list.
pub fn merge_intervals(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut sorted: Vec<TimeInterval> = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Remove every `busy` range from `open`, returning what is left.
///
/// The result is sorted and contains only positive-length pieces.
pub fn subtract_intervals(open: &[TimeInterval], busy: &[TimeInterval]) -> Vec<TimeInterval> {
    let busy = merge_intervals(busy);
    let mut free = Vec::new();

    for window in merge_intervals(open) {
        let mut cursor = window.start;
        for b in busy.iter().filter(|b| b.overlaps(&window)) {
            if cursor < b.start {
                free.push(TimeInterval {
                    start: cursor,
                    end: b.start,
                });
            }
            cursor = cursor.max(b.end);
        }
        if cursor < window.end {
            free.push(TimeInterval {
                start: cursor,
                end: window.end,
            });
        }
    }

    free
}

/// Open intervals for each day of a recurring week.
///
/// Days with no availability are never stored, and each day's list is kept sorted
/// and merged, so two values compare equal whenever they describe the same week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyAvailability {
    days: BTreeMap<DayOfWeek, Vec<TimeInterval>>,
}

impl WeeklyAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the intervals for `day`. An empty list removes the day.
    pub fn set(&mut self, day: DayOfWeek, intervals: &[TimeInterval]) {
        let merged = merge_intervals(intervals);
        if merged.is_empty() {
            self.days.remove(&day);
        } else {
            self.days.insert(day, merged);
        }
    }

    /// Add one interval to `day`, merging with what is already there.
    pub fn add(&mut self, day: DayOfWeek, interval: TimeInterval) {
        let mut current = self.days.remove(&day).unwrap_or_default();
        current.push(interval);
        self.set(day, &current);
    }

    /// Intervals for `day`; empty when the day has no availability.
    pub fn intervals(&self, day: DayOfWeek) -> &[TimeInterval] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days with at least one interval, Monday first.
    pub fn days(&self) -> impl Iterator<Item = DayOfWeek> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayOfWeek, &[TimeInterval])> + '_ {
        self.days.iter().map(|(day, list)| (*day, list.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Drop every day for which `keep` returns false.
    pub fn retain_days(&mut self, mut keep: impl FnMut(DayOfWeek) -> bool) {
        self.days.retain(|day, _| keep(*day));
    }

    /// The same intervals on every day in `days`.
    pub fn uniform(days: impl IntoIterator<Item = DayOfWeek>, interval: TimeInterval) -> Self {
        let mut week = Self::new();
        for day in days {
            week.add(day, interval);
        }
        week
    }
}

impl FromIterator<(DayOfWeek, TimeInterval)> for WeeklyAvailability {
    fn from_iter<I: IntoIterator<Item = (DayOfWeek, TimeInterval)>>(iter: I) -> Self {
        let mut grouped: BTreeMap<DayOfWeek, Vec<TimeInterval>> = BTreeMap::new();
        for (day, interval) in iter {
            grouped.entry(day).or_default().push(interval);
        }
        let mut week = Self::new();
        for (day, intervals) in grouped {
            week.set(day, &intervals);
        }
        week
    }
}
