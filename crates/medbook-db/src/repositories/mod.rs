//! Repository implementations
//!
//! This module contains concrete implementations of the repository traits
//! defined in medbook-core, using sqlx for PostgreSQL access.

pub mod appointment_repo;
pub mod doctor_repo;
pub mod user_repo;

pub use appointment_repo::PgAppointmentRepository;
pub use doctor_repo::PgDoctorRepository;
pub use user_repo::PgUserRepository;
