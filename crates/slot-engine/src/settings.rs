//! Typed per-tenant booking configuration.
//!
//! Settings are resolved once per request by whoever owns tenant configuration and
//! passed in as a value; the engine never looks them up by key.

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval::TimeInterval;
use crate::model::TenantId;
use crate::time::parse_timezone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// IANA timezone the practice operates in.
    pub timezone: String,
    pub session_duration_minutes: u32,
    /// Step between consecutive slot starts. `0` means "same as the session duration".
    pub slot_interval_minutes: u32,
    /// Minimum notice before a booking may start.
    pub advance_booking_hours: u32,
    /// How far ahead slots are offered.
    pub max_advance_days: u32,
    /// Hours used for practitioners with no availability configured at all.
    /// `None` means such practitioners cannot be booked.
    pub default_hours: Option<DefaultHours>,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            session_duration_minutes: 30,
            slot_interval_minutes: 0,
            advance_booking_hours: 0,
            max_advance_days: 60,
            default_hours: Some(DefaultHours::default()),
        }
    }
}

impl BookingSettings {
    pub fn session_duration(&self) -> Duration {
        Duration::minutes(self.session_duration_minutes as i64)
    }

    pub fn slot_step(&self) -> Duration {
        match self.slot_interval_minutes {
            0 => self.session_duration(),
            m => Duration::minutes(m as i64),
        }
    }

    pub fn advance_notice(&self) -> Duration {
        Duration::hours(self.advance_booking_hours as i64)
    }
}

/// Opening hours applied to every day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for DefaultHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DefaultHours {
    pub fn interval(&self) -> Result<TimeInterval> {
        TimeInterval::new(self.start, self.end)
    }
}

/// Everything tenant-specific an engine call needs, threaded explicitly.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub timezone: Tz,
    pub settings: BookingSettings,
}

impl TenantContext {
    /// Validate the settings' timezone once and bind it to the tenant.
    pub fn new(tenant_id: TenantId, settings: BookingSettings) -> Result<Self> {
        let timezone = parse_timezone(&settings.timezone)?;
        Ok(Self {
            tenant_id,
            timezone,
            settings,
        })
    }
}
