//! Data transfer objects for the MedBook API

pub mod appointment;
pub mod common;
pub mod doctor;

pub use appointment::{
    AppointmentResponse, AvailabilityResponse, CreateAppointmentRequest, StatsResponse,
    StatusResponse, UpdateStatusRequest,
};
pub use common::{MessageResponse, PaginationParams};
pub use doctor::{CreateDoctorRequest, DoctorResponse, UpdateDoctorRequest};
