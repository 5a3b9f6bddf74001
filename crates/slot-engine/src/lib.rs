//! # slot-engine
//!
//! Appointment availability resolution and booking conflict detection for
//! multi-practitioner clinics.
//!
//! Given practitioners, a service, a location, and a delivery mode, the engine
//! works out when they are jointly free by choosing the right availability source
//! (portal overrides or general availability), applying tenant day restrictions,
//! intersecting across practitioners, and subtracting existing bookings. It also
//! validates that a specific candidate slot does not double-book anyone, at any
//! location.
//!
//! The engine is pure computation over records supplied through
//! [`store::SchedulingStore`]; tenant and timezone are always passed explicitly.
//!
//! ## Modules
//!
//! - [`time`] — Day-of-week bucketing and timezone conversion
//! - [`dst`] — DST gap policies
//! - [`interval`] — Half-open interval arithmetic and weekly availability maps
//! - [`model`] — Scheduling records and the booking candidate
//! - [`resolver`] — Select the availability source for one practitioner
//! - [`intersect`] — Joint availability across practitioners
//! - [`conflict`] — Detect overlapping bookings
//! - [`service`] — Façade answering "what is free" and "is this slot free"
//! - [`booker`] — Serialized validate-and-insert of new bookings
//! - [`store`] — Data-access seam and an in-memory implementation
//! - [`settings`] — Typed per-tenant booking configuration
//! - [`error`] — Error types

pub mod booker;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod intersect;
pub mod interval;
pub mod model;
pub mod resolver;
pub mod service;
pub mod settings;
pub mod store;
pub mod time;

pub use booker::{Booker, BookingRequest};
pub use conflict::{check_candidate, find_booking_conflicts, Conflict};
pub use error::EngineError;
pub use interval::{TimeInterval, WeeklyAvailability};
pub use service::{AvailabilityQuery, OpenSlot, SlotAvailabilityService};
pub use settings::{BookingSettings, TenantContext};
pub use store::{InMemoryStore, PracticeData, SchedulingStore, StoreError};
pub use time::DayOfWeek;
