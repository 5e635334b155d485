//! State store key constants and builders for MedBook
//!
//! Provides standardized key naming patterns for every entry the backend
//! owns in the shared store, ensuring consistency across the application
//! and preventing key collisions.
//!
//! # Key Patterns
//!
//! - `booking:lock:{userId}:{date}:{time}` - Booking mutual-exclusion token
//! - `ratelimit:{path}:{clientId}` - Fixed-window request counter
//! - `user:{userId}:appointments` - Cached per-user appointment list
//! - `doctors:list` - Cached doctor directory

use chrono::NaiveDate;
use uuid::Uuid;

/// Prefix for booking locks
///
/// Format: `booking:lock:{userId}:{date}:{time}`
pub const BOOKING_LOCK_PREFIX: &str = "booking:lock";

/// Prefix for rate-limit windows
///
/// Format: `ratelimit:{path}:{clientId}`
pub const RATE_LIMIT_PREFIX: &str = "ratelimit";

/// Cache key for the doctor directory
pub const DOCTORS_LIST_KEY: &str = "doctors:list";

/// Booking lock TTL (safety net against crashed holders)
pub const BOOKING_LOCK_TTL_SECS: u64 = 30;

/// TTL for a cached per-user appointment list
pub const USER_APPOINTMENTS_TTL_SECS: u64 = 30;

/// TTL for the cached doctor directory (doctors change infrequently)
pub const DOCTORS_LIST_TTL_SECS: u64 = 60;

/// Build the booking lock key for a (caller, date, time) triple
///
/// Scoped per caller rather than per doctor: the lock collapses duplicate
/// rapid-fire submissions from one caller, while cross-caller contention is
/// resolved by the durable conflict checks.
pub fn booking_lock_key(user_id: Uuid, date: NaiveDate, time: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        BOOKING_LOCK_PREFIX,
        user_id,
        date.format("%Y-%m-%d"),
        time
    )
}

/// Build the rate-limit window key for a route and caller
pub fn rate_limit_key(path: &str, client_id: &str) -> String {
    format!("{}:{}:{}", RATE_LIMIT_PREFIX, path, client_id)
}

/// Build the cache key for a user's appointment list
pub fn user_appointments_key(user_id: Uuid) -> String {
    format!("user:{}:appointments", user_id)
}
