//! Doctor DTOs

use medbook_core::models::{Doctor, Gender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request body for creating a doctor (admin only)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Contact email
    #[validate(email)]
    pub email: String,

    /// Contact phone
    #[validate(length(min = 1, max = 50))]
    pub phone: String,

    /// Medical speciality
    #[validate(length(min = 1, max = 200))]
    pub speciality: String,

    /// Short biography
    #[validate(length(max = 10000))]
    pub bio: Option<String>,

    /// Gender, used to pick an avatar style
    pub gender: Gender,

    /// Whether the doctor can receive bookings (defaults to true)
    pub is_active: Option<bool>,
}

/// Request body for updating a doctor (admin only)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    /// Contact email
    #[validate(email)]
    pub email: Option<String>,

    /// Contact phone
    #[validate(length(min = 1, max = 50))]
    pub phone: Option<String>,

    /// Medical speciality
    #[validate(length(min = 1, max = 200))]
    pub speciality: Option<String>,

    /// Short biography
    #[validate(length(max = 10000))]
    pub bio: Option<String>,

    /// Gender
    pub gender: Option<Gender>,

    /// Whether the doctor can receive bookings
    pub is_active: Option<bool>,
}

/// Doctor response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorResponse {
    /// Doctor identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Medical speciality
    pub speciality: String,
    /// Short biography
    pub bio: Option<String>,
    /// Avatar URL
    pub image_url: String,
    /// Gender
    pub gender: Gender,
    /// Whether the doctor can receive bookings
    pub is_active: bool,
    /// Lifetime appointment count
    pub appointment_count: i64,
}

impl From<(Doctor, i64)> for DoctorResponse {
    fn from((doctor, appointment_count): (Doctor, i64)) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            phone: doctor.phone,
            speciality: doctor.speciality,
            bio: doctor.bio,
            image_url: doctor.image_url,
            gender: doctor.gender,
            is_active: doctor.is_active,
            appointment_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateDoctorRequest {
        CreateDoctorRequest {
            name: "Ana Garcia".to_string(),
            email: "ana@example.com".to_string(),
            phone: "555-0100".to_string(),
            speciality: "Orthodontics".to_string(),
            bio: None,
            gender: Gender::Female,
            is_active: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut req = valid_request();
        req.email = "not-an-email".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut req = valid_request();
        req.name = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let doctor = Doctor::new(
            "Ana Garcia".to_string(),
            "ana@example.com".to_string(),
            "555-0100".to_string(),
            "Orthodontics".to_string(),
            None,
            Gender::Female,
            true,
        );

        let json = serde_json::to_string(&DoctorResponse::from((doctor, 3))).unwrap();
        assert!(json.contains("\"imageUrl\""));
        assert!(json.contains("\"isActive\":true"));
        assert!(json.contains("\"appointmentCount\":3"));
        assert!(json.contains("\"gender\":\"FEMALE\""));
    }
}
