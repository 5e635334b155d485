//! Business logic services for MedBook
//!
//! This crate contains the booking-concurrency and traffic-shaping core:
//! the components that guarantee at most one appointment per slot under
//! concurrent requests, and the generic request-shaping built on the same
//! shared state store.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, state store)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `BookingService` - Orchestrates one booking attempt end to end
//! - `BookingLock` - Per-(caller, slot) mutual exclusion with TTL backstop
//! - `ConflictDetector` - Parallel durable-state validation under a deadline
//! - `RateLimiter` - Fixed-window request limiting with named presets
//! - `NotificationDispatcher` - Queued fire-and-forget email side effects

pub mod booking;
pub mod booking_lock;
pub mod conflicts;
pub mod notify;
pub mod rate_limit;

pub use booking::{BookingRequest, BookingService};
pub use booking_lock::BookingLock;
pub use conflicts::ConflictDetector;
pub use notify::{run_worker, AppointmentNotice, BookingEvent, NotificationDispatcher};
pub use rate_limit::{
    client_key, AdmissionDecision, RateLimitPreset, RateLimiter, LENIENT, MODERATE, PER_ORIGIN,
    STRICT,
};

/// Reason recorded when the caller does not supply one
pub const DEFAULT_REASON: &str = "General consultation";
