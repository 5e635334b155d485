//! User model
//!
//! Users are provisioned by the external identity provider; the backend
//! upserts a local row keyed by the provider's stable identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Stable identifier from the external identity provider
    pub external_id: String,

    /// Email address
    pub email: String,

    /// First name as reported by the identity provider
    pub first_name: Option<String>,

    /// Last name as reported by the identity provider
    pub last_name: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name: "First Last" with missing parts dropped
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_names(first: Option<&str>, last: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            external_id: "idp_123".to_string(),
            email: "pat@example.com".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            user_with_names(Some("Ada"), Some("Lovelace")).display_name(),
            "Ada Lovelace"
        );
        assert_eq!(user_with_names(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(user_with_names(None, None).display_name(), "");
    }
}
