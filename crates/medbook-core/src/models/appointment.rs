//! Appointment model
//!
//! An appointment occupies a slot: a (doctor, date, time) triple that can
//! host at most one active appointment. That invariant is enforced by the
//! booking pipeline's conflict checks, not by a database constraint.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Appointment status
///
/// Both statuses count as slot-occupying for conflict detection.
/// Cancellation is a hard delete, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Booked and upcoming
    #[default]
    Confirmed,
    /// Visit took place
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl AppointmentStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CONFIRMED" => Some(AppointmentStatus::Confirmed),
            "COMPLETED" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }
}

/// Appointment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Booking patient
    pub user_id: Uuid,

    /// Booked doctor
    pub doctor_id: Uuid,

    /// Appointment date
    pub date: NaiveDate,

    /// Appointment time in HH:MM format
    pub time: String,

    /// Duration in minutes
    pub duration_minutes: i32,

    /// Current status
    pub status: AppointmentStatus,

    /// Reason for the visit
    pub reason: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Create a new confirmed appointment
    pub fn new(
        user_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: String,
        duration_minutes: i32,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            doctor_id,
            date,
            time,
            duration_minutes,
            status: AppointmentStatus::Confirmed,
            reason,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Date in YYYY-MM-DD form for API responses and cache keys
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Appointment joined with patient and doctor display fields
///
/// Shape returned by list/detail queries; the route layer converts it
/// directly into a response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetail {
    /// Underlying appointment
    pub appointment: Appointment,

    /// Patient display name ("First Last", trimmed)
    pub patient_name: String,

    /// Patient email
    pub patient_email: String,

    /// Doctor display name
    pub doctor_name: String,

    /// Doctor email
    pub doctor_email: String,

    /// Doctor avatar URL
    pub doctor_image_url: String,
}
