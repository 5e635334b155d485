//! Common traits for the state store, repositories, and outbound adapters
//!
//! Defines the seams between the booking core and its collaborators: the
//! key-value state store, the relational record store, and the mailer.

use crate::error::AppError;
use crate::models::{Appointment, AppointmentDetail, AppointmentStatus, Doctor, User};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Key-value state store with per-key TTL expiry
///
/// The sole shared mutable resource between request tasks. Values are
/// JSON-serialized; a key may expire and read back as absent at any time.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get a value by key, `None` if absent or expired
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set a value with a TTL in seconds
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete a key; `Ok(false)` if it was already absent
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
}

/// A same-time appointment with a different doctor, surfaced so the
/// rejection message can name the conflicting doctor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleClash {
    /// Doctor holding the conflicting appointment
    pub doctor_id: Uuid,

    /// That doctor's display name
    pub doctor_name: String,
}

/// Appointment repository trait
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persist a new appointment
    async fn create(&self, entity: &Appointment) -> Result<Appointment, AppError>;

    /// Find appointment by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;

    /// Find appointment by ID with patient and doctor display fields
    async fn find_detail(&self, id: Uuid) -> Result<Option<AppointmentDetail>, AppError>;

    /// List a user's appointments ordered by date then time
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AppointmentDetail>, AppError>;

    /// List all appointments with pagination (admin view)
    async fn list_all(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AppointmentDetail>, i64), AppError>;

    /// Hard-delete an appointment (cancellation)
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Update appointment status
    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppError>;

    /// Booked times for a doctor on a date, sorted ascending
    async fn booked_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppError>;

    /// Is the doctor's slot taken by any patient?
    async fn slot_taken(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, AppError>;

    /// Does the user already hold this exact slot with this doctor?
    async fn duplicate_booking(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, AppError>;

    /// Does the user hold the same slot with any doctor?
    async fn user_conflict(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> Result<Option<ScheduleClash>, AppError>;

    /// Count appointments with a given status
    async fn count_by_status(&self, status: AppointmentStatus) -> Result<i64, AppError>;
}

/// Doctor repository trait
#[async_trait]
pub trait DoctorRepository: Send + Sync {
    /// Persist a new doctor
    async fn create(&self, entity: &Doctor) -> Result<Doctor, AppError>;

    /// Update an existing doctor
    async fn update(&self, entity: &Doctor) -> Result<Doctor, AppError>;

    /// Find doctor by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, AppError>;

    /// List all doctors with their appointment counts, ordered by name
    async fn list_with_counts(&self) -> Result<Vec<(Doctor, i64)>, AppError>;
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create or refresh a user row from identity-provider profile fields
    async fn upsert_by_external_id(
        &self,
        external_id: &str,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, AppError>;

    /// Find user by internal ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

/// Outbound transactional email message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// HTML body
    pub html: String,
}

/// Transactional email adapter
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &MailMessage) -> Result<(), AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10); // page 0 becomes 1
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000); // per_page capped at 1000
        assert_eq!(p.per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }
}
