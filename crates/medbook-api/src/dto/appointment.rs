//! Appointment DTOs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use medbook_core::models::{AppointmentDetail, AppointmentStatus};
use medbook_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Request body for booking an appointment
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    /// Target doctor
    pub doctor_id: Uuid,

    /// Date in YYYY-MM-DD format
    #[validate(custom(function = validate_date))]
    pub date: String,

    /// Time in HH:MM format
    #[validate(custom(function = validate_time))]
    pub time: String,

    /// Reason for the visit
    #[validate(length(max = 10000))]
    pub reason: Option<String>,

    /// Duration in minutes
    #[validate(range(min = 1, max = 480))]
    pub duration: Option<i32>,
}

impl CreateAppointmentRequest {
    /// Parse the validated date string
    pub fn parse_date(&self) -> AppResult<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| AppError::InvalidInput("Date must be in YYYY-MM-DD format".to_string()))
    }
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("date_format"))
}

fn validate_time(value: &str) -> Result<(), ValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new("time_format"))
}

/// Request body for updating an appointment's status
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status
    pub status: AppointmentStatus,
}

/// Appointment response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    /// Appointment identifier
    pub id: Uuid,
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Time in HH:MM format
    pub time: String,
    /// Duration in minutes
    pub duration: i32,
    /// Current status
    pub status: AppointmentStatus,
    /// Free-form notes
    pub notes: Option<String>,
    /// Reason for the visit
    pub reason: Option<String>,
    /// Patient display name
    pub patient_name: String,
    /// Patient email
    pub patient_email: String,
    /// Doctor display name
    pub doctor_name: String,
    /// Doctor avatar URL
    pub doctor_image_url: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<AppointmentDetail> for AppointmentResponse {
    fn from(detail: AppointmentDetail) -> Self {
        let date = detail.appointment.date_string();
        Self {
            id: detail.appointment.id,
            date,
            time: detail.appointment.time,
            duration: detail.appointment.duration_minutes,
            status: detail.appointment.status,
            notes: detail.appointment.notes,
            reason: detail.appointment.reason,
            patient_name: detail.patient_name,
            patient_email: detail.patient_email,
            doctor_name: detail.doctor_name,
            doctor_image_url: detail.doctor_image_url,
            created_at: detail.appointment.created_at,
        }
    }
}

/// Response body after a status update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Appointment identifier
    pub id: Uuid,
    /// Status after the update
    pub status: AppointmentStatus,
    /// Update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Booked slots for a doctor on one date
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    /// Doctor identifier
    pub doctor_id: Uuid,
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Times already taken, ascending
    pub booked_slots: Vec<String>,
}

/// Aggregate appointment counts for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// All appointments
    pub total: i64,
    /// Currently confirmed
    pub confirmed: i64,
    /// Completed visits
    pub completed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            doctor_id: Uuid::from_u128(1),
            date: "2025-06-01".to_string(),
            time: "09:00".to_string(),
            reason: None,
            duration: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut req = valid_request();
        req.date = "06/01/2025".to_string();
        assert!(req.validate().is_err());

        req.date = "2025-13-40".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_bad_time_rejected() {
        let mut req = valid_request();
        req.time = "9 o'clock".to_string();
        assert!(req.validate().is_err());

        req.time = "25:99".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_duration_bounds() {
        let mut req = valid_request();
        req.duration = Some(0);
        assert!(req.validate().is_err());

        req.duration = Some(481);
        assert!(req.validate().is_err());

        req.duration = Some(45);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "doctorId": "00000000-0000-0000-0000-000000000001",
            "date": "2025-06-01",
            "time": "09:00",
            "duration": 45
        }"#;

        let req: CreateAppointmentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.doctor_id, Uuid::from_u128(1));
        assert_eq!(req.duration, Some(45));
        assert_eq!(req.parse_date().unwrap().to_string(), "2025-06-01");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let json = serde_json::to_string(&StatusResponse {
            id: Uuid::from_u128(1),
            status: AppointmentStatus::Completed,
            updated_at: Utc::now(),
        })
        .unwrap();

        assert!(json.contains("\"status\":\"COMPLETED\""));
        assert!(json.contains("\"updatedAt\""));
    }
}
