//! API layer for MedBook
//!
//! HTTP DTOs, caller-identity extraction, and route handlers for the
//! appointment-booking backend.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

pub mod dto;
pub mod handlers;
pub mod identity;

// Re-export DTOs (common types)
pub use dto::{AppointmentResponse, DoctorResponse, MessageResponse, PaginationParams};

// Re-export handler configuration functions and wiring aliases
pub use handlers::{configure_appointments, configure_doctors, Booking, Limiter};
pub use identity::{CallerIdentity, RequestOrigin};
