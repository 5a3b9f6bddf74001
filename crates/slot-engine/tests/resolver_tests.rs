//! Tests for availability source selection.

mod common;

use common::*;
use slot_engine::model::{AvailabilitySlot, LocationId, Mode};
use slot_engine::resolver::{
    resolve_practitioner, AvailabilitySource, PractitionerRecords, ResolveFilter,
};
use slot_engine::{DayOfWeek, TimeInterval};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn iv(start: u32, end: u32) -> TimeInterval {
    TimeInterval::hm(start, 0, end, 0).unwrap()
}

fn weekdays(practitioner: &str, location: Option<&str>) -> Vec<AvailabilitySlot> {
    [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ]
    .into_iter()
    .map(|day| slot(practitioner, location, day, t(9, 0), t(17, 0)))
    .collect()
}

fn in_person(location: &LocationId) -> ResolveFilter<'_> {
    ResolveFilter {
        location_id: Some(location),
        mode: Mode::InPerson,
    }
}

// ── Source selection ────────────────────────────────────────────────────────

#[test]
fn general_availability_used_without_overrides() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        ..Default::default()
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::GeneralAvailability);
    assert_eq!(resolved.days.days().count(), 5);
    assert_eq!(resolved.days.intervals(DayOfWeek::Monday), &[iv(9, 17)]);
}

#[test]
fn disabled_override_blanks_day_even_with_general_availability() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: vec![slot("p1", Some("downtown"), DayOfWeek::Monday, t(9, 0), t(17, 0))],
        overrides: vec![portal(
            "p1",
            Some("downtown"),
            DayOfWeek::Monday,
            t(9, 0),
            t(17, 0),
            false,
        )],
        restriction: None,
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::PortalOverride);
    assert!(resolved.days.intervals(DayOfWeek::Monday).is_empty());
    assert!(resolved.days.is_empty());
}

#[test]
fn overrides_replace_general_availability_for_every_day() {
    // One enabled override on Tuesday switches the whole week to overrides.
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![portal(
            "p1",
            Some("downtown"),
            DayOfWeek::Tuesday,
            t(10, 0),
            t(12, 0),
            true,
        )],
        restriction: None,
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::PortalOverride);
    assert_eq!(resolved.days.days().collect::<Vec<_>>(), vec![DayOfWeek::Tuesday]);
    assert_eq!(resolved.days.intervals(DayOfWeek::Tuesday), &[iv(10, 12)]);
}

#[test]
fn overrides_at_other_location_do_not_trigger_cutover_for_in_person() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![portal("p1", Some("uptown"), DayOfWeek::Monday, t(9, 0), t(17, 0), false)],
        restriction: None,
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::GeneralAvailability);
    assert_eq!(resolved.days.intervals(DayOfWeek::Monday), &[iv(9, 17)]);
}

#[test]
fn virtual_mode_ignores_location() {
    let p = pid("p1");
    let records = PractitionerRecords {
        slots: vec![
            slot("p1", Some("uptown"), DayOfWeek::Monday, t(9, 0), t(12, 0)),
            slot("p1", None, DayOfWeek::Monday, t(14, 0), t(16, 0)),
        ],
        ..Default::default()
    };
    let filter = ResolveFilter {
        location_id: None,
        mode: Mode::Virtual,
    };

    let resolved = resolve_practitioner(&p, &records, filter);

    assert_eq!(resolved.days.intervals(DayOfWeek::Monday), &[iv(9, 12), iv(14, 16)]);
}

#[test]
fn in_person_filters_slots_by_location() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: vec![
            slot("p1", Some("uptown"), DayOfWeek::Monday, t(9, 0), t(12, 0)),
            slot("p1", Some("downtown"), DayOfWeek::Monday, t(14, 0), t(16, 0)),
        ],
        ..Default::default()
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.days.intervals(DayOfWeek::Monday), &[iv(14, 16)]);
}

#[test]
fn multiple_slots_per_day_kept_separately() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: vec![
            slot("p1", Some("downtown"), DayOfWeek::Thursday, t(17, 0), t(20, 0)),
            slot("p1", Some("downtown"), DayOfWeek::Thursday, t(8, 0), t(12, 0)),
        ],
        ..Default::default()
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.days.intervals(DayOfWeek::Thursday), &[iv(8, 12), iv(17, 20)]);
}

// ── Tenant restriction ──────────────────────────────────────────────────────

#[test]
fn tenant_restriction_intersects_days() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![],
        restriction: Some(restriction("p1", &[DayOfWeek::Monday, DayOfWeek::Wednesday])),
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(
        resolved.days.days().collect::<Vec<_>>(),
        vec![DayOfWeek::Monday, DayOfWeek::Wednesday]
    );
}

#[test]
fn restriction_with_no_common_days_yields_nothing() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![],
        restriction: Some(restriction("p1", &[DayOfWeek::Saturday])),
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert!(resolved.days.is_empty());
}

#[test]
fn empty_restriction_restricts_nothing() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![],
        restriction: Some(restriction("p1", &[])),
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.days.days().count(), 5);
}

#[test]
fn overrides_outside_restricted_days_do_not_trigger_cutover() {
    // The only override is on Friday, which the tenant does not allow, so general
    // availability still applies to the allowed days.
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("downtown")),
        overrides: vec![portal("p1", Some("downtown"), DayOfWeek::Friday, t(9, 0), t(10, 0), true)],
        restriction: Some(restriction("p1", &[DayOfWeek::Monday])),
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::GeneralAvailability);
    assert_eq!(resolved.days.days().collect::<Vec<_>>(), vec![DayOfWeek::Monday]);
}

// ── Missing data ────────────────────────────────────────────────────────────

#[test]
fn no_records_reports_no_configuration() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");

    let resolved = resolve_practitioner(&p, &PractitionerRecords::default(), in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::NoConfiguration);
    assert!(resolved.days.is_empty());
}

#[test]
fn records_filtered_out_are_not_missing_configuration() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: weekdays("p1", Some("uptown")),
        ..Default::default()
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert_eq!(resolved.source, AvailabilitySource::GeneralAvailability);
    assert!(resolved.days.is_empty());
}

#[test]
fn inverted_records_contribute_nothing() {
    let p = pid("p1");
    let loc = LocationId::new("downtown");
    let records = PractitionerRecords {
        slots: vec![
            slot("p1", Some("downtown"), DayOfWeek::Monday, t(17, 0), t(9, 0)),
            slot("p1", Some("downtown"), DayOfWeek::Tuesday, t(9, 0), t(17, 0)),
        ],
        ..Default::default()
    };

    let resolved = resolve_practitioner(&p, &records, in_person(&loc));

    assert!(resolved.days.intervals(DayOfWeek::Monday).is_empty());
    assert_eq!(resolved.days.intervals(DayOfWeek::Tuesday), &[iv(9, 17)]);
}
