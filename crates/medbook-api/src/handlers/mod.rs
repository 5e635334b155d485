//! HTTP handlers for the MedBook API

pub mod appointment;
pub mod doctor;

pub use appointment::configure_appointments;
pub use doctor::configure_doctors;

use actix_web::HttpResponseBuilder;
use medbook_cache::RedisCache;
use medbook_db::{PgAppointmentRepository, PgDoctorRepository};
use medbook_services::{AdmissionDecision, BookingService, RateLimiter};

/// Booking service as wired in the binary
pub type Booking = BookingService<PgAppointmentRepository, PgDoctorRepository, RedisCache>;

/// Rate limiter as wired in the binary
pub type Limiter = RateLimiter<RedisCache>;

/// Attach the standard quota headers to an admitted response
pub fn apply_quota_headers(builder: &mut HttpResponseBuilder, decision: &AdmissionDecision) {
    builder.insert_header(("X-RateLimit-Limit", decision.limit.to_string()));
    builder.insert_header(("X-RateLimit-Remaining", decision.remaining.to_string()));
    builder.insert_header(("X-RateLimit-Reset", decision.reset_at().to_rfc3339()));
}
