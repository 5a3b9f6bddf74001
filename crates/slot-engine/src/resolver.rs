//! Availability source resolution for a single practitioner.
//!
//! Portal overrides and general availability are never blended. If the
//! practitioner has any override row that matches the location/mode/day filters,
//! enabled or not, overrides are the only source; otherwise general availability is.
//! Presence decides the cutover, so a block of disabled override rows yields zero
//! availability even when general availability exists for those days.

use serde::Serialize;
use tracing::debug;

use crate::interval::{TimeInterval, WeeklyAvailability};
use crate::model::{
    record_interval, AvailabilitySlot, LocationId, Mode, PortalAvailabilityOverride,
    PractitionerId, TenantAvailabilityRestriction,
};
use crate::time::DayOfWeek;

/// Which records produced a practitioner's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilitySource {
    PortalOverride,
    GeneralAvailability,
    /// The practitioner has no override or general availability rows at all.
    /// The caller decides whether a fallback applies.
    NoConfiguration,
}

/// The raw records for one practitioner, as fetched from the store.
#[derive(Debug, Clone, Default)]
pub struct PractitionerRecords {
    pub slots: Vec<AvailabilitySlot>,
    pub overrides: Vec<PortalAvailabilityOverride>,
    pub restriction: Option<TenantAvailabilityRestriction>,
}

/// What the resolver selects for one practitioner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAvailability {
    pub practitioner_id: PractitionerId,
    pub source: AvailabilitySource,
    pub days: WeeklyAvailability,
}

/// Location and mode filters shared by every practitioner in a query.
#[derive(Debug, Clone, Copy)]
pub struct ResolveFilter<'a> {
    pub location_id: Option<&'a LocationId>,
    pub mode: Mode,
}

impl ResolveFilter<'_> {
    /// Location only matters for in-person appointments.
    fn location_matches(&self, record_location: Option<&LocationId>) -> bool {
        !self.mode.filters_by_location() || record_location == self.location_id
    }
}

/// Select and group the availability that applies to `practitioner_id`.
///
/// Missing data never errors. A practitioner with no rows at all gets an empty week
/// tagged [`AvailabilitySource::NoConfiguration`]; rows that exist but match none of
/// the filters give an empty week from [`AvailabilitySource::GeneralAvailability`].
pub fn resolve_practitioner(
    practitioner_id: &PractitionerId,
    records: &PractitionerRecords,
    filter: ResolveFilter<'_>,
) -> ResolvedAvailability {
    let day_allowed = |day: DayOfWeek| {
        records
            .restriction
            .as_ref()
            .is_none_or(|r| r.allows(day))
    };

    let overrides: Vec<&PortalAvailabilityOverride> = records
        .overrides
        .iter()
        .filter(|o| &o.practitioner_id == practitioner_id)
        .filter(|o| filter.location_matches(o.location_id.as_ref()))
        .filter(|o| day_allowed(o.day_of_week))
        .collect();

    let (source, days) = if !overrides.is_empty() {
        let days: WeeklyAvailability = overrides
            .iter()
            .filter(|o| o.is_enabled)
            .filter_map(|o| Some((o.day_of_week, record_interval(o.start_time, o.end_time)?)))
            .collect();
        (AvailabilitySource::PortalOverride, days)
    } else {
        let matching: Vec<(DayOfWeek, TimeInterval)> = records
            .slots
            .iter()
            .filter(|s| &s.practitioner_id == practitioner_id)
            .filter(|s| filter.location_matches(s.location_id.as_ref()))
            .filter(|s| day_allowed(s.day_of_week))
            .filter_map(|s| Some((s.day_of_week, record_interval(s.start_time, s.end_time)?)))
            .collect();
        let configured = records
            .overrides
            .iter()
            .any(|o| &o.practitioner_id == practitioner_id)
            || records.slots.iter().any(|s| &s.practitioner_id == practitioner_id);
        if configured {
            (
                AvailabilitySource::GeneralAvailability,
                matching.into_iter().collect::<WeeklyAvailability>(),
            )
        } else {
            (AvailabilitySource::NoConfiguration, WeeklyAvailability::new())
        }
    };

    debug!(
        practitioner = %practitioner_id,
        source = ?source,
        days = days.days().count(),
        "resolved availability source"
    );

    ResolvedAvailability {
        practitioner_id: practitioner_id.clone(),
        source,
        days,
    }
}

/// Intersect a week's days with a tenant restriction.
///
/// A missing or empty restriction leaves the week unchanged.
pub fn apply_restriction(
    week: &mut WeeklyAvailability,
    restriction: Option<&TenantAvailabilityRestriction>,
) {
    if let Some(r) = restriction {
        week.retain_days(|day| r.allows(day));
    }
}
