//! Scheduling records the engine reads, plus the transient candidate it evaluates.
//!
//! The engine owns none of these; they are supplied by a [`crate::store::SchedulingStore`].

use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::interval::TimeInterval;
use crate::time::DayOfWeek;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a tenant (one practice).
    TenantId
);
string_id!(PractitionerId);
string_id!(LocationId);
string_id!(ServiceId);

/// Identifier of a persisted booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub Uuid);

impl BookingId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery channel of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    InPerson,
    Virtual,
    Hybrid,
}

impl Mode {
    /// Only in-person appointments are tied to a physical location.
    pub fn filters_by_location(self) -> bool {
        matches!(self, Mode::InPerson)
    }
}

/// A practitioner's general, recurring weekly availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub practitioner_id: PractitionerId,
    /// `None` for virtual-only availability.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Tenant-specific availability that fully replaces [`AvailabilitySlot`] when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAvailabilityOverride {
    pub practitioner_id: PractitionerId,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_enabled: bool,
}

/// Per-tenant allow-list of days a practitioner may be booked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAvailabilityRestriction {
    pub practitioner_id: PractitionerId,
    pub available_days: Vec<DayOfWeek>,
}

impl TenantAvailabilityRestriction {
    /// Whether `day` passes the restriction. An empty allow-list restricts nothing.
    pub fn allows(&self, day: DayOfWeek) -> bool {
        self.available_days.is_empty() || self.available_days.contains(&day)
    }
}

/// Links a bookable service to the practitioners who offer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub service_id: ServiceId,
    pub practitioner_ids: Vec<PractitionerId>,
}

/// Lifecycle state of a booking. Bookings are never deleted, only cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Requested,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Whether a booking in this state still occupies its practitioners' time.
    pub fn blocks_time(self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::NoShow)
    }
}

/// A persisted appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    /// Ordered; the first entry is the primary practitioner.
    pub practitioner_ids: Vec<PractitionerId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: BookingStatus,
}

impl Booking {
    pub fn primary_practitioner(&self) -> Option<&PractitionerId> {
        self.practitioner_ids.first()
    }

    pub fn involves(&self, practitioner_id: &PractitionerId) -> bool {
        self.practitioner_ids.contains(practitioner_id)
    }

    pub fn is_active(&self) -> bool {
        self.status.blocks_time()
    }
}

/// A booking under evaluation. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub practitioner_ids: Vec<PractitionerId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CandidateSlot {
    pub fn new(
        practitioner_ids: Vec<PractitionerId>,
        location_id: Option<LocationId>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self> {
        if start_time >= end_time {
            return Err(EngineError::InvalidInterval(format!(
                "candidate start {} is not before end {}",
                start_time, end_time
            )));
        }
        Ok(Self {
            practitioner_ids,
            location_id,
            start_time,
            end_time,
        })
    }
}

/// Checked conversion from a stored record to a [`TimeInterval`].
///
/// Records with `start_time >= end_time` are treated as contributing nothing.
pub(crate) fn record_interval(start: NaiveTime, end: NaiveTime) -> Option<TimeInterval> {
    TimeInterval::new(start, end).ok()
}
