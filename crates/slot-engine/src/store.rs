//! Data-access seam between the engine and whatever persists scheduling records.
//!
//! The engine depends on exactly these reads plus one write (booking insert). Any
//! storage technology can sit behind [`SchedulingStore`]; [`InMemoryStore`] backs the
//! CLI and tests.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::model::{
    AvailabilitySlot, Booking, PortalAvailabilityOverride, PractitionerId, ServiceId,
    ServiceOffering, TenantAvailabilityRestriction, TenantId,
};
use crate::settings::BookingSettings;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backing store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a write (constraint violation or similar).
    #[error("store rejected write: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Total attempts for one store read: the first try plus one retry.
const READ_ATTEMPTS: u32 = 2;

/// Run a store read, retrying once before giving up with
/// [`EngineError::AvailabilityUnavailable`]. A failed read is never treated as
/// "no data".
pub(crate) fn read_with_retry<T>(
    what: &str,
    mut read: impl FnMut() -> StoreResult<T>,
) -> Result<T> {
    let mut attempt = 1;
    loop {
        match read() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < READ_ATTEMPTS => {
                warn!(read = what, attempt, error = %err, "store read failed, retrying");
                attempt += 1;
            }
            Err(err) => {
                return Err(EngineError::AvailabilityUnavailable(format!("{}: {}", what, err)));
            }
        }
    }
}

/// Read access to scheduling records plus the booking insert.
///
/// All reads are scoped to a tenant. Implementations must be safe to share across
/// request-handling threads.
pub trait SchedulingStore: Send + Sync {
    fn availability_slots(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<AvailabilitySlot>>;

    fn portal_overrides(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<PortalAvailabilityOverride>>;

    fn tenant_restriction(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Option<TenantAvailabilityRestriction>>;

    /// Bookings involving `practitioner` that intersect `[from, to)`, in any status.
    fn bookings(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>>;

    /// Practitioners offering `service`.
    fn practitioners_for_service(
        &self,
        tenant: &TenantId,
        service: &ServiceId,
    ) -> StoreResult<Vec<PractitionerId>>;

    fn insert_booking(&self, tenant: &TenantId, booking: Booking) -> StoreResult<Booking>;
}

/// Every record for one tenant, in the shape the CLI reads from and writes to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeData {
    pub tenant_id: Option<TenantId>,
    pub settings: BookingSettings,
    pub availability_slots: Vec<AvailabilitySlot>,
    pub portal_overrides: Vec<PortalAvailabilityOverride>,
    pub restrictions: Vec<TenantAvailabilityRestriction>,
    pub services: Vec<ServiceOffering>,
    pub bookings: Vec<Booking>,
}

impl PracticeData {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A single-tenant store held in memory.
///
/// Reads for any other tenant return nothing, which mirrors how a tenant-scoped
/// database behaves.
#[derive(Debug)]
pub struct InMemoryStore {
    tenant: TenantId,
    data: RwLock<PracticeData>,
}

impl InMemoryStore {
    pub fn new(tenant: TenantId, data: PracticeData) -> Self {
        Self {
            tenant,
            data: RwLock::new(data),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// A copy of the current records, including bookings inserted since creation.
    pub fn snapshot(&self) -> StoreResult<PracticeData> {
        self.read(|data| data.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&PracticeData) -> T) -> StoreResult<T> {
        let guard = self
            .data
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn scoped<T: Default>(
        &self,
        tenant: &TenantId,
        f: impl FnOnce(&PracticeData) -> T,
    ) -> StoreResult<T> {
        if *tenant != self.tenant {
            return Ok(T::default());
        }
        self.read(f)
    }
}

impl SchedulingStore for InMemoryStore {
    fn availability_slots(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<AvailabilitySlot>> {
        self.scoped(tenant, |data| {
            data.availability_slots
                .iter()
                .filter(|s| &s.practitioner_id == practitioner)
                .cloned()
                .collect()
        })
    }

    fn portal_overrides(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Vec<PortalAvailabilityOverride>> {
        self.scoped(tenant, |data| {
            data.portal_overrides
                .iter()
                .filter(|o| &o.practitioner_id == practitioner)
                .cloned()
                .collect()
        })
    }

    fn tenant_restriction(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
    ) -> StoreResult<Option<TenantAvailabilityRestriction>> {
        self.scoped(tenant, |data| {
            data.restrictions
                .iter()
                .find(|r| &r.practitioner_id == practitioner)
                .cloned()
        })
    }

    fn bookings(
        &self,
        tenant: &TenantId,
        practitioner: &PractitionerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        self.scoped(tenant, |data| {
            data.bookings
                .iter()
                .filter(|b| b.involves(practitioner) && b.start_time < to && b.end_time > from)
                .cloned()
                .collect()
        })
    }

    fn practitioners_for_service(
        &self,
        tenant: &TenantId,
        service: &ServiceId,
    ) -> StoreResult<Vec<PractitionerId>> {
        self.scoped(tenant, |data| {
            data.services
                .iter()
                .filter(|s| &s.service_id == service)
                .flat_map(|s| s.practitioner_ids.iter().cloned())
                .collect()
        })
    }

    fn insert_booking(&self, tenant: &TenantId, booking: Booking) -> StoreResult<Booking> {
        if *tenant != self.tenant {
            return Err(StoreError::Rejected(format!("unknown tenant '{}'", tenant)));
        }
        let mut guard = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))?;
        if guard.bookings.iter().any(|b| b.id == booking.id) {
            return Err(StoreError::Rejected(format!("duplicate booking id {}", booking.id)));
        }
        guard.bookings.push(booking.clone());
        Ok(booking)
    }
}
