//! Slot availability façade: the entry point booking handlers call.
//!
//! Composes source resolution, multi-practitioner intersection, booking
//! subtraction, and conflict validation over a [`SchedulingStore`]. Holds no state
//! of its own beyond the store handle, so one instance can serve many threads.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info_span};

use crate::conflict;
use crate::dst::{resolve_local, DstPolicy};
use crate::error::Result;
use crate::interval::{subtract_intervals, TimeInterval, WeeklyAvailability};
use crate::intersect::intersect_weeks;
use crate::model::{Booking, CandidateSlot, LocationId, Mode, PractitionerId, ServiceId};
use crate::resolver::{
    apply_restriction, resolve_practitioner, AvailabilitySource, PractitionerRecords,
    ResolveFilter,
};
use crate::settings::TenantContext;
use crate::store::{read_with_retry, SchedulingStore};
use crate::time::{local_day_bounds, to_local, week_start, DayOfWeek};

/// Who is being booked, where, and how.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityQuery {
    /// Practitioners who must all attend. When empty, `service_id` decides.
    pub practitioner_ids: Vec<PractitionerId>,
    pub service_id: Option<ServiceId>,
    pub location_id: Option<LocationId>,
    pub mode: Mode,
}

/// A concrete bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `start` on the practice's wall clock.
    pub local_start: NaiveDateTime,
    pub day: DayOfWeek,
}

pub struct SlotAvailabilityService<S> {
    store: Arc<S>,
}

impl<S> Clone for SlotAvailabilityService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SchedulingStore> SlotAvailabilityService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The practitioners a query refers to.
    ///
    /// Explicit practitioners win. Otherwise the service's practitioners are looked
    /// up; a service nobody offers gives an empty list, not an error.
    pub fn resolve_practitioners(
        &self,
        ctx: &TenantContext,
        query: &AvailabilityQuery,
    ) -> Result<Vec<PractitionerId>> {
        let mut ids = if !query.practitioner_ids.is_empty() {
            query.practitioner_ids.clone()
        } else if let Some(service) = &query.service_id {
            read_with_retry("practitioners_for_service", || {
                self.store.practitioners_for_service(&ctx.tenant_id, service)
            })?
        } else {
            Vec::new()
        };

        let mut seen = Vec::with_capacity(ids.len());
        ids.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
        Ok(ids)
    }

    /// Recurring weekly availability shared by all `practitioners`, before bookings.
    ///
    /// Practitioners with no configuration at all get the tenant's default hours on
    /// every day (still subject to their day restriction), or nothing when the tenant
    /// has no default hours.
    pub fn recurring_availability(
        &self,
        ctx: &TenantContext,
        practitioners: &[PractitionerId],
        location_id: Option<&LocationId>,
        mode: Mode,
    ) -> Result<WeeklyAvailability> {
        let filter = ResolveFilter { location_id, mode };
        let mut weeks = Vec::with_capacity(practitioners.len());

        for practitioner in practitioners {
            let records = self.fetch_records(ctx, practitioner)?;
            let resolved = resolve_practitioner(practitioner, &records, filter);

            let week = match (resolved.source, &ctx.settings.default_hours) {
                (AvailabilitySource::NoConfiguration, Some(hours)) => {
                    let mut week = WeeklyAvailability::uniform(DayOfWeek::ALL, hours.interval()?);
                    apply_restriction(&mut week, records.restriction.as_ref());
                    debug!(
                        tenant = %ctx.tenant_id,
                        practitioner = %practitioner,
                        "no availability configured, using default hours"
                    );
                    week
                }
                _ => resolved.days,
            };

            if week.is_empty() {
                // Nobody can attend jointly if one practitioner never can.
                return Ok(WeeklyAvailability::new());
            }
            weeks.push(week);
        }

        Ok(intersect_weeks(&weeks))
    }

    /// Free intervals per day for the week (Monday to Sunday) containing `week_of`.
    ///
    /// Recurring availability is intersected across practitioners and then every
    /// active booking of any of them is subtracted. "No availability" is an empty
    /// result, never an error.
    pub fn get_availability(
        &self,
        ctx: &TenantContext,
        query: &AvailabilityQuery,
        week_of: NaiveDate,
    ) -> Result<WeeklyAvailability> {
        let span = info_span!("get_availability", tenant = %ctx.tenant_id, week = %week_of);
        let _enter = span.enter();

        let practitioners = self.resolve_practitioners(ctx, query)?;
        if practitioners.is_empty() {
            debug!("no practitioners for query");
            return Ok(WeeklyAvailability::new());
        }

        let recurring = self.recurring_availability(
            ctx,
            &practitioners,
            query.location_id.as_ref(),
            query.mode,
        )?;
        if recurring.is_empty() {
            return Ok(recurring);
        }

        let monday = week_start(week_of);
        let sunday = monday + Duration::days(6);
        let bookings = self.bookings_between(ctx, &practitioners, monday, sunday)?;

        let mut week = WeeklyAvailability::new();
        for offset in 0..7 {
            let date = monday + Duration::days(offset);
            let day = DayOfWeek::of_date(date);
            let free = free_on_date(recurring.intervals(day), date, &bookings, ctx.timezone);
            week.set(day, &free);
        }
        Ok(week)
    }

    /// Bookable slots of `session_duration_minutes` for each local date in `[from, to]`.
    ///
    /// Slots start at each free interval's start and step by the configured slot
    /// interval. Slots starting before `now + advance_booking_hours`, or on dates more
    /// than `max_advance_days` after `now`, are left out. Local times that do not exist
    /// because of a DST change are skipped.
    pub fn open_slots(
        &self,
        ctx: &TenantContext,
        query: &AvailabilityQuery,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpenSlot>> {
        let settings = &ctx.settings;
        let earliest = now + settings.advance_notice();
        let last_date = to_local(now, ctx.timezone).date()
            + Duration::days(settings.max_advance_days as i64);
        let to = to.min(last_date);
        if from > to || settings.session_duration_minutes == 0 {
            return Ok(Vec::new());
        }

        let practitioners = self.resolve_practitioners(ctx, query)?;
        if practitioners.is_empty() {
            return Ok(Vec::new());
        }
        let recurring = self.recurring_availability(
            ctx,
            &practitioners,
            query.location_id.as_ref(),
            query.mode,
        )?;
        if recurring.is_empty() {
            return Ok(Vec::new());
        }
        let bookings = self.bookings_between(ctx, &practitioners, from, to)?;

        let mut slots = Vec::new();
        let mut date = from;
        while date <= to {
            let day = DayOfWeek::of_date(date);
            let free = free_on_date(recurring.intervals(day), date, &bookings, ctx.timezone);
            for interval in &free {
                slots.extend(
                    chop_interval(interval, date, day, ctx)
                        .into_iter()
                        .filter(|slot| slot.start >= earliest),
                );
            }
            let Some(next) = date.succ_opt() else { break };
            date = next;
        }

        debug!(tenant = %ctx.tenant_id, slots = slots.len(), "generated open slots");
        Ok(slots)
    }

    /// Check a candidate against existing bookings for every practitioner on it.
    ///
    /// Fails with [`crate::EngineError::SlotConflict`] listing every conflicting booking.
    pub fn validate_candidate(&self, ctx: &TenantContext, candidate: &CandidateSlot) -> Result<()> {
        let bookings = self.bookings_around(ctx, candidate)?;
        conflict::check_candidate(candidate, &bookings, ctx.timezone)
    }

    /// Bookings that could conflict with `candidate`, read from the store.
    pub(crate) fn bookings_around(
        &self,
        ctx: &TenantContext,
        candidate: &CandidateSlot,
    ) -> Result<Vec<Booking>> {
        // Generous margin so the candidate's whole local day(s) are covered in any zone.
        let margin = Duration::days(2);
        self.fetch_bookings(
            ctx,
            &candidate.practitioner_ids,
            candidate.start_time - margin,
            candidate.end_time + margin,
        )
    }

    fn bookings_between(
        &self,
        ctx: &TenantContext,
        practitioners: &[PractitionerId],
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let (from, _) = local_day_bounds(first, ctx.timezone);
        let (_, to) = local_day_bounds(last, ctx.timezone);
        self.fetch_bookings(ctx, practitioners, from, to)
    }

    fn fetch_bookings(
        &self,
        ctx: &TenantContext,
        practitioners: &[PractitionerId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let mut all: Vec<Booking> = Vec::new();
        for practitioner in practitioners {
            let bookings = read_with_retry("bookings", || {
                self.store.bookings(&ctx.tenant_id, practitioner, from, to)
            })?;
            for booking in bookings {
                if !all.iter().any(|b| b.id == booking.id) {
                    all.push(booking);
                }
            }
        }
        Ok(all)
    }

    fn fetch_records(
        &self,
        ctx: &TenantContext,
        practitioner: &PractitionerId,
    ) -> Result<PractitionerRecords> {
        let tenant = &ctx.tenant_id;
        Ok(PractitionerRecords {
            slots: read_with_retry("availability_slots", || {
                self.store.availability_slots(tenant, practitioner)
            })?,
            overrides: read_with_retry("portal_overrides", || {
                self.store.portal_overrides(tenant, practitioner)
            })?,
            restriction: read_with_retry("tenant_restriction", || {
                self.store.tenant_restriction(tenant, practitioner)
            })?,
        })
    }
}

/// Last representable wall-clock time, standing in for "until midnight".
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// `open` on `date` with every active booking's local footprint removed.
fn free_on_date(
    open: &[TimeInterval],
    date: NaiveDate,
    bookings: &[Booking],
    tz: Tz,
) -> Vec<TimeInterval> {
    if open.is_empty() {
        return Vec::new();
    }
    let (day_start, day_end) = local_day_bounds(date, tz);

    let busy: Vec<TimeInterval> = bookings
        .iter()
        .filter(|b| b.is_active())
        .filter_map(|b| booked_span(b, date, (day_start, day_end), tz))
        .collect();

    subtract_intervals(open, &busy)
}

/// Wall-clock span a booking occupies on `date`, clipped to that day.
///
/// When the clocks go back during the booking, the repeated hour is read twice and
/// the span covers both readings.
fn booked_span(
    booking: &Booking,
    date: NaiveDate,
    (day_start, day_end): (DateTime<Utc>, DateTime<Utc>),
    tz: Tz,
) -> Option<TimeInterval> {
    let start = booking.start_time.max(day_start);
    let end = booking.end_time.min(day_end);
    if start >= end {
        return None;
    }

    // Offsets in force at the first and last booked instants.
    let before = utc_offset(start, tz);
    let after = utc_offset(end - Duration::nanoseconds(1), tz);

    let mut from = if start == day_start {
        NaiveTime::MIN
    } else {
        wall_time(start, before, date)
    };
    let mut to = wall_time(end, after, date);
    if after < before {
        let change = offset_change(start, end, after, tz);
        from = from.min(wall_time(change, after, date));
        to = to.max(wall_time(change, before, date));
    }
    TimeInterval::new(from, to).ok()
}

fn utc_offset(instant: DateTime<Utc>, tz: Tz) -> Duration {
    let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
    Duration::seconds(offset.local_minus_utc() as i64)
}

/// `instant` read with `offset`, clamped to the bounds of `date`.
fn wall_time(instant: DateTime<Utc>, offset: Duration, date: NaiveDate) -> NaiveTime {
    let local = instant.naive_utc() + offset;
    match local.date().cmp(&date) {
        Ordering::Less => NaiveTime::MIN,
        Ordering::Equal => local.time(),
        Ordering::Greater => end_of_day(),
    }
}

/// First whole second in `[start, end)` at which `after` is the offset in force.
fn offset_change(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    after: Duration,
    tz: Tz,
) -> DateTime<Utc> {
    let mut lo = start.timestamp();
    let mut hi = (end - Duration::nanoseconds(1)).timestamp();
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        match DateTime::<Utc>::from_timestamp(mid, 0) {
            Some(at) if utc_offset(at, tz) == after => hi = mid,
            _ => lo = mid,
        }
    }
    DateTime::<Utc>::from_timestamp(hi, 0).unwrap_or(end)
}

/// Cut one free interval into session-length slots.
fn chop_interval(
    interval: &TimeInterval,
    date: NaiveDate,
    day: DayOfWeek,
    ctx: &TenantContext,
) -> Vec<OpenSlot> {
    let duration = ctx.settings.session_duration();
    let step = ctx.settings.slot_step();
    let interval_end = date.and_time(interval.end);

    let mut slots = Vec::new();
    let mut local_start = date.and_time(interval.start);
    while local_start + duration <= interval_end {
        if let Some(start) = resolve_local(local_start, ctx.timezone, DstPolicy::Skip) {
            let start = start.with_timezone(&Utc);
            slots.push(OpenSlot {
                start,
                end: start + duration,
                local_start,
                day,
            });
        }
        local_start += step;
    }
    slots
}
