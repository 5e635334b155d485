//! Doctor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Doctor gender, used to pick an avatar style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "MALE"),
            Gender::Female => write!(f, "FEMALE"),
        }
    }
}

impl Gender {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MALE" => Some(Gender::Male),
            "FEMALE" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Doctor entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Contact email (also receives booking notifications)
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

    /// Inactive doctors cannot receive new bookings
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Create a new doctor with a generated avatar
    pub fn new(
        name: String,
        email: String,
        phone: String,
        speciality: String,
        bio: Option<String>,
        gender: Gender,
        is_active: bool,
    ) -> Self {
        let now = Utc::now();
        let image_url = Self::generate_image_url(&name, gender);
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            speciality,
            bio,
            image_url,
            gender,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a deterministic avatar URL from name and gender
    pub fn generate_image_url(name: &str, gender: Gender) -> String {
        let style = match gender {
            Gender::Female => "avataaars",
            Gender::Male => "micah",
        };
        let seed: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("https://api.dicebear.com/7.x/{}/svg?seed={}", style, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_roundtrip() {
        assert_eq!(Gender::from_str("male"), Some(Gender::Male));
        assert_eq!(Gender::from_str("FEMALE"), Some(Gender::Female));
        assert_eq!(Gender::from_str("other"), None);
        assert_eq!(Gender::Female.to_string(), "FEMALE");
    }

    #[test]
    fn test_generate_image_url() {
        let url = Doctor::generate_image_url("Jane Doe", Gender::Female);
        assert!(url.starts_with("https://api.dicebear.com/7.x/avataaars/svg?seed="));
        assert!(url.ends_with("Jane-Doe"));

        let url = Doctor::generate_image_url("John", Gender::Male);
        assert!(url.contains("/micah/"));
    }

    #[test]
    fn test_new_doctor_is_stamped() {
        let doctor = Doctor::new(
            "Ana Garcia".to_string(),
            "ana@example.com".to_string(),
            "555-0100".to_string(),
            "Orthodontics".to_string(),
            None,
            Gender::Female,
            true,
        );

        assert!(doctor.is_active);
        assert!(!doctor.image_url.is_empty());
    }
}
