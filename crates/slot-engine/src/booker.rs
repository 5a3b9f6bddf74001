//! Serialized booking creation.
//!
//! Validation and insert are two store calls, so two requests for the same slot
//! could both pass validation. [`Booker`] closes that window by funnelling every
//! booking for a practitioner through that practitioner's lock: the re-read,
//! conflict check, and insert happen while the lock is held. Joint bookings take
//! all their practitioners' locks in sorted order so two joint requests cannot
//! deadlock.
//!
//! This guarantees exclusion only among writers sharing one `Booker`; a store with
//! several writer processes needs a range-exclusion constraint of its own.


use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::model::{
    Booking, BookingId, BookingStatus, CandidateSlot, LocationId, PractitionerId, ServiceId,
    TenantId,
};
use crate::service::{AvailabilityQuery, SlotAvailabilityService};
use crate::settings::TenantContext;
use crate::store::SchedulingStore;
use crate::time::{add_minutes, to_utc};

/// A booking as submitted by a booking handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Ordered, primary first. When empty, the service's practitioners are used.
    #[serde(default)]
    pub practitioner_ids: Vec<PractitionerId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// Local start time in the practice timezone, e.g. `2026-03-16 10:00`.
    pub start: String,
    /// Overrides the tenant's session duration.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub status: BookingStatus,
}

type LockKey = (TenantId, PractitionerId);

/// Creates bookings one practitioner at a time.
///
/// `locks` gains an entry the first time a tenant's practitioner is booked and keeps
/// it for the life of the `Booker`; its size tracks the practitioner roster, not the
/// booking volume.
pub struct Booker<S> {
    service: SlotAvailabilityService<S>,
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl<S: SchedulingStore> Booker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            service: SlotAvailabilityService::new(store),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &SlotAvailabilityService<S> {
        &self.service
    }

    /// Turn a request into the candidate the conflict detector evaluates.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTimeFormat`] for an unparseable start, and
    /// [`EngineError::NoPractitioners`] when neither practitioners nor an offered
    /// service identify who to book.
    pub fn candidate(
        &self,
        ctx: &TenantContext,
        request: &BookingRequest,
    ) -> Result<CandidateSlot> {
        let start = to_utc(&request.start, ctx.timezone)?;
        let minutes = request
            .duration_minutes
            .unwrap_or(ctx.settings.session_duration_minutes);
        let end = add_minutes(start, minutes as i64);

        let practitioners = self.service.resolve_practitioners(
            ctx,
            &AvailabilityQuery {
                practitioner_ids: request.practitioner_ids.clone(),
                service_id: request.service_id.clone(),
                ..AvailabilityQuery::default()
            },
        )?;
        if practitioners.is_empty() {
            return Err(EngineError::NoPractitioners);
        }

        CandidateSlot::new(practitioners, request.location_id.clone(), start, end)
    }

    /// Validate and insert a booking atomically with respect to other bookings made
    /// through this `Booker`.
    ///
    /// `now` anchors the advance-notice rule. Requests with a status that does not
    /// block time (cancelled, no-show) are refused.
    pub fn book(
        &self,
        ctx: &TenantContext,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        if !request.status.blocks_time() {
            return Err(EngineError::InactiveStatus(request.status));
        }
        let candidate = self.candidate(ctx, request)?;

        let earliest = now + ctx.settings.advance_notice();
        if candidate.start_time < earliest {
            warn!(
                tenant = %ctx.tenant_id,
                start = %candidate.start_time,
                %earliest,
                "booking rejected: inside advance notice window"
            );
            return Err(EngineError::BookingTooSoon { earliest });
        }

        let locks = self.locks_for(&ctx.tenant_id, &candidate.practitioner_ids);
        let _guards: Vec<MutexGuard<'_, ()>> = locks
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        self.service.validate_candidate(ctx, &candidate)?;

        let booking = Booking {
            id: BookingId::new_v4(),
            practitioner_ids: candidate.practitioner_ids,
            location_id: candidate.location_id,
            service_id: request.service_id.clone(),
            start_time: candidate.start_time,
            end_time: candidate.end_time,
            status: request.status,
        };
        let stored = self.service.store().insert_booking(&ctx.tenant_id, booking)?;

        info!(
            tenant = %ctx.tenant_id,
            booking = %stored.id,
            practitioners = stored.practitioner_ids.len(),
            start = %stored.start_time,
            "booking created"
        );
        Ok(stored)
    }

    /// Per-practitioner locks in sorted key order.
    fn locks_for(
        &self,
        tenant: &TenantId,
        practitioners: &[PractitionerId],
    ) -> Vec<Arc<Mutex<()>>> {
        let mut keys: Vec<LockKey> = practitioners
            .iter()
            .map(|p| (tenant.clone(), p.clone()))
            .collect();
        keys.sort();
        keys.dedup();

        let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        keys.into_iter()
            .map(|key| Arc::clone(table.entry(key).or_default()))
            .collect()
    }
}
