//! Domain models for MedBook
//!
//! This module contains all the core domain models used throughout the application.

pub mod appointment;
pub mod doctor;
pub mod user;

pub use appointment::{Appointment, AppointmentDetail, AppointmentStatus};
pub use doctor::{Doctor, Gender};
pub use user::User;
