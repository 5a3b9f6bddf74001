//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use slot_engine::model::{
    AvailabilitySlot, Booking, BookingId, BookingStatus, LocationId, PortalAvailabilityOverride,
    PractitionerId, ServiceId, ServiceOffering, TenantAvailabilityRestriction, TenantId,
};
use slot_engine::store::StoreResult;
use slot_engine::{
    BookingSettings, DayOfWeek, InMemoryStore, PracticeData, SchedulingStore, StoreError,
    TenantContext,
};
use uuid::Uuid;

pub const TENANT: &str = "riverside-clinic";

pub fn t(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

pub fn utc(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

pub fn pid(id: &str) -> PractitionerId {
    PractitionerId::new(id)
}

pub fn slot(
    practitioner: &str,
    location: Option<&str>,
    day: DayOfWeek,
    start: NaiveTime,
    end: NaiveTime,
) -> AvailabilitySlot {
    AvailabilitySlot {
        practitioner_id: pid(practitioner),
        location_id: location.map(LocationId::new),
        day_of_week: day,
        start_time: start,
        end_time: end,
    }
}

pub fn portal(
    practitioner: &str,
    location: Option<&str>,
    day: DayOfWeek,
    start: NaiveTime,
    end: NaiveTime,
    enabled: bool,
) -> PortalAvailabilityOverride {
    PortalAvailabilityOverride {
        practitioner_id: pid(practitioner),
        location_id: location.map(LocationId::new),
        day_of_week: day,
        start_time: start,
        end_time: end,
        is_enabled: enabled,
    }
}

pub fn restriction(practitioner: &str, days: &[DayOfWeek]) -> TenantAvailabilityRestriction {
    TenantAvailabilityRestriction {
        practitioner_id: pid(practitioner),
        available_days: days.to_vec(),
    }
}

pub fn offering(service: &str, practitioners: &[&str]) -> ServiceOffering {
    ServiceOffering {
        service_id: ServiceId::new(service),
        practitioner_ids: practitioners.iter().map(|p| pid(p)).collect(),
    }
}

pub fn booking(
    n: u128,
    practitioners: &[&str],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: BookingStatus,
) -> Booking {
    Booking {
        id: BookingId(Uuid::from_u128(n)),
        practitioner_ids: practitioners.iter().map(|p| pid(p)).collect(),
        location_id: None,
        service_id: None,
        start_time: start,
        end_time: end,
        status,
    }
}

pub fn store(data: PracticeData) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(TenantId::new(TENANT), data))
}

pub fn ctx(settings: BookingSettings) -> TenantContext {
    TenantContext::new(TenantId::new(TENANT), settings).unwrap()
}

pub fn ctx_in(timezone: &str) -> TenantContext {
    ctx(BookingSettings {
        timezone: timezone.to_string(),
        ..BookingSettings::default()
    })
}

/// Fails the first `failures` reads, then delegates to an in-memory store.
pub struct FlakyStore {
    inner: InMemoryStore,
    failures_left: AtomicU32,
}

impl FlakyStore {
    pub fn new(data: PracticeData, failures: u32) -> Self {
        Self {
            inner: InMemoryStore::new(TenantId::new(TENANT), data),
            failures_left: AtomicU32::new(failures),
        }
    }

    fn trip(&self) -> StoreResult<()> {
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StoreError::Unavailable("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SchedulingStore for FlakyStore {
    fn availability_slots(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<AvailabilitySlot>> {
        self.trip()?;
        self.inner.availability_slots(tenant, practitioner)
    }

    fn portal_overrides(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<PortalAvailabilityOverride>> {
        self.trip()?;
        self.inner.portal_overrides(tenant, practitioner)
    }

    fn tenant_restriction(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Option<TenantAvailabilityRestriction>> {
        self.trip()?;
        self.inner.tenant_restriction(tenant, practitioner)
    }

    fn bookings(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        self.trip()?;
        self.inner.bookings(tenant, practitioner, from, to)
    }

    fn practitioners_for_service(
        &self,
        tenant: &TenantId,
        service: &ServiceId,
    ) -> StoreResult<Vec<PractitionerId>> {
        self.trip()?;
        self.inner.practitioners_for_service(tenant, service)
    }

    fn insert_booking(&self, tenant: &TenantId, booking: Booking) -> StoreResult<Booking> {
        self.inner.insert_booking(tenant, booking)
    }
}
