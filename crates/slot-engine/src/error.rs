//! Error types for slot-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{BookingId, BookingStatus};
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// The candidate overlaps one or more active bookings.
    #[error("Time slot no longer available (conflicts with {} booking(s))", .booking_ids.len())]
    SlotConflict { booking_ids: Vec<BookingId> },

    #[error("Booking starts too soon; earliest allowed start is {earliest}")]
    BookingTooSoon { earliest: DateTime<Utc> },

    /// New bookings must hold their practitioners' time.
    #[error("Cannot create a booking with status {0:?}")]
    InactiveStatus(BookingStatus),

    #[error("No practitioner to book: specify a practitioner or a service someone offers")]
    NoPractitioners,

    /// A read or write against the scheduling store failed after retrying.
    #[error("Availability temporarily unavailable: {0}")]
    AvailabilityUnavailable(String),
}

impl EngineError {
    /// Conflicting booking ids when this is a [`EngineError::SlotConflict`].
    pub fn conflicting_bookings(&self) -> Option<&[BookingId]> {
        match self {
            EngineError::SlotConflict { booking_ids } => Some(booking_ids),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::AvailabilityUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
