//! Appointment repository implementation
//!
//! Provides PostgreSQL-backed storage for appointments, including the three
//! conflict existence queries the booking pipeline validates against. The
//! slot invariant lives in those queries, not in a unique constraint, so
//! they must stay aligned with the status set the application treats as
//! slot-occupying.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use medbook_core::{
    models::{Appointment, AppointmentDetail, AppointmentStatus},
    traits::{AppointmentRepository, ScheduleClash},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Statuses that occupy a slot for conflict purposes
const ACTIVE_STATUSES: &str = "('CONFIRMED', 'COMPLETED')";

/// PostgreSQL implementation of AppointmentRepository
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    /// Create a new appointment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse appointment status from string
    fn parse_status(s: &str) -> AppointmentStatus {
        AppointmentStatus::from_str(s).unwrap_or(AppointmentStatus::Confirmed)
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Appointment) -> AppResult<Appointment> {
        debug!(
            "Creating appointment for user {} with doctor {}",
            entity.user_id, entity.doctor_id
        );

        let row = sqlx::query_as::<sqlx::Postgres, AppointmentRow>(
            r#"
            INSERT INTO appointments (
                id, user_id, doctor_id, date, time,
                duration_minutes, status, reason, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, user_id, doctor_id, date, time,
                duration_minutes, status, reason, notes,
                created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(entity.user_id)
        .bind(entity.doctor_id)
        .bind(entity.date)
        .bind(&entity.time)
        .bind(entity.duration_minutes)
        .bind(entity.status.to_string())
        .bind(&entity.reason)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating appointment: {}", e);
            AppError::Database(format!("Failed to create appointment: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Appointment>> {
        debug!("Finding appointment by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, AppointmentRow>(
            r#"
            SELECT
                id, user_id, doctor_id, date, time,
                duration_minutes, status, reason, notes,
                created_at, updated_at
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding appointment {}: {}", id, e);
            AppError::Database(format!("Failed to find appointment: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_detail(&self, id: Uuid) -> AppResult<Option<AppointmentDetail>> {
        debug!("Finding appointment detail by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, AppointmentDetailRow>(
            r#"
            SELECT
                a.id, a.user_id, a.doctor_id, a.date, a.time,
                a.duration_minutes, a.status, a.reason, a.notes,
                a.created_at, a.updated_at,
                u.first_name AS patient_first_name,
                u.last_name AS patient_last_name,
                u.email AS patient_email,
                d.name AS doctor_name,
                d.email AS doctor_email,
                d.image_url AS doctor_image_url
            FROM appointments a
            JOIN users u ON u.id = a.user_id
            JOIN doctors d ON d.id = a.doctor_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding appointment detail {}: {}", id, e);
            AppError::Database(format!("Failed to find appointment: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<AppointmentDetail>> {
        debug!("Listing appointments for user: {}", user_id);

        let rows = sqlx::query_as::<sqlx::Postgres, AppointmentDetailRow>(
            r#"
            SELECT
                a.id, a.user_id, a.doctor_id, a.date, a.time,
                a.duration_minutes, a.status, a.reason, a.notes,
                a.created_at, a.updated_at,
                u.first_name AS patient_first_name,
                u.last_name AS patient_last_name,
                u.email AS patient_email,
                d.name AS doctor_name,
                d.email AS doctor_email,
                d.image_url AS doctor_image_url
            FROM appointments a
            JOIN users u ON u.id = a.user_id
            JOIN doctors d ON d.id = a.doctor_id
            WHERE a.user_id = $1
            ORDER BY a.date ASC, a.time ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing appointments: {}", e);
            AppError::Database(format!("Failed to list appointments: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_all(
        &self,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<AppointmentDetail>, i64)> {
        debug!("Listing all appointments, limit {} offset {}", limit, offset);

        let rows = sqlx::query_as::<sqlx::Postgres, AppointmentDetailRow>(
            r#"
            SELECT
                a.id, a.user_id, a.doctor_id, a.date, a.time,
                a.duration_minutes, a.status, a.reason, a.notes,
                a.created_at, a.updated_at,
                u.first_name AS patient_first_name,
                u.last_name AS patient_last_name,
                u.email AS patient_email,
                d.name AS doctor_name,
                d.email AS doctor_email,
                d.image_url AS doctor_image_url
            FROM appointments a
            JOIN users u ON u.id = a.user_id
            JOIN doctors d ON d.id = a.doctor_id
            ORDER BY a.date DESC, a.time DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing appointments: {}", e);
            AppError::Database(format!("Failed to list appointments: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM appointments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting appointments: {}", e);
                AppError::Database(format!("Failed to count appointments: {}", e))
            })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting appointment: {}", id);

        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting appointment {}: {}", id, e);
                AppError::Database(format!("Failed to delete appointment: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> AppResult<Appointment> {
        debug!("Updating appointment {} status to {}", id, status);

        let row = sqlx::query_as::<sqlx::Postgres, AppointmentRow>(
            r#"
            UPDATE appointments
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, user_id, doctor_id, date, time,
                duration_minutes, status, reason, notes,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating appointment status: {}", e);
            AppError::Database(format!("Failed to update appointment status: {}", e))
        })?
        .ok_or_else(|| AppError::AppointmentNotFound(id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn booked_slots(&self, doctor_id: Uuid, date: NaiveDate) -> AppResult<Vec<String>> {
        debug!("Fetching booked slots for doctor {} on {}", doctor_id, date);

        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            r#"
            SELECT time
            FROM appointments
            WHERE doctor_id = $1
                AND date = $2
                AND status IN {}
            ORDER BY time ASC
            "#,
            ACTIVE_STATUSES
        ))
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error fetching booked slots: {}", e);
            AppError::Database(format!("Failed to fetch booked slots: {}", e))
        })?;

        Ok(rows.into_iter().map(|(time,)| time).collect())
    }

    #[instrument(skip(self))]
    async fn slot_taken(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> AppResult<bool> {
        let row: (bool,) = sqlx::query_as(&format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE doctor_id = $1
                    AND date = $2
                    AND time = $3
                    AND status IN {}
            )
            "#,
            ACTIVE_STATUSES
        ))
        .bind(doctor_id)
        .bind(date)
        .bind(time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking doctor slot: {}", e);
            AppError::Database(format!("Failed to check doctor slot: {}", e))
        })?;

        Ok(row.0)
    }

    #[instrument(skip(self))]
    async fn duplicate_booking(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> AppResult<bool> {
        let row: (bool,) = sqlx::query_as(&format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE user_id = $1
                    AND doctor_id = $2
                    AND date = $3
                    AND time = $4
                    AND status IN {}
            )
            "#,
            ACTIVE_STATUSES
        ))
        .bind(user_id)
        .bind(doctor_id)
        .bind(date)
        .bind(time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking duplicate booking: {}", e);
            AppError::Database(format!("Failed to check duplicate booking: {}", e))
        })?;

        Ok(row.0)
    }

    #[instrument(skip(self))]
    async fn user_conflict(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> AppResult<Option<ScheduleClash>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(&format!(
            r#"
            SELECT d.id, d.name
            FROM appointments a
            JOIN doctors d ON d.id = a.doctor_id
            WHERE a.user_id = $1
                AND a.date = $2
                AND a.time = $3
                AND a.status IN {}
            LIMIT 1
            "#,
            ACTIVE_STATUSES
        ))
        .bind(user_id)
        .bind(date)
        .bind(time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking schedule conflict: {}", e);
            AppError::Database(format!("Failed to check schedule conflict: {}", e))
        })?;

        Ok(row.map(|(doctor_id, doctor_name)| ScheduleClash {
            doctor_id,
            doctor_name,
        }))
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self, status: AppointmentStatus) -> AppResult<i64> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM appointments WHERE status = $1")
                .bind(status.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error counting appointments: {}", e);
                    AppError::Database(format!("Failed to count appointments: {}", e))
                })?;

        Ok(result.0)
    }
}

/// Helper struct for mapping appointment rows
#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    user_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    time: String,
    duration_minutes: i32,
    status: String,
    reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            doctor_id: row.doctor_id,
            date: row.date,
            time: row.time,
            duration_minutes: row.duration_minutes,
            status: PgAppointmentRepository::parse_status(&row.status),
            reason: row.reason,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping joined appointment detail rows
#[derive(Debug, sqlx::FromRow)]
struct AppointmentDetailRow {
    id: Uuid,
    user_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    time: String,
    duration_minutes: i32,
    status: String,
    reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    patient_first_name: Option<String>,
    patient_last_name: Option<String>,
    patient_email: String,
    doctor_name: String,
    doctor_email: String,
    doctor_image_url: String,
}

impl From<AppointmentDetailRow> for AppointmentDetail {
    fn from(row: AppointmentDetailRow) -> Self {
        let patient_name = format!(
            "{} {}",
            row.patient_first_name.as_deref().unwrap_or(""),
            row.patient_last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string();

        Self {
            appointment: Appointment {
                id: row.id,
                user_id: row.user_id,
                doctor_id: row.doctor_id,
                date: row.date,
                time: row.time,
                duration_minutes: row.duration_minutes,
                status: PgAppointmentRepository::parse_status(&row.status),
                reason: row.reason,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            patient_name,
            patient_email: row.patient_email,
            doctor_name: row.doctor_name,
            doctor_email: row.doctor_email,
            doctor_image_url: row.doctor_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgAppointmentRepository::parse_status("CONFIRMED"),
            AppointmentStatus::Confirmed
        );
        assert_eq!(
            PgAppointmentRepository::parse_status("COMPLETED"),
            AppointmentStatus::Completed
        );
        // Unknown statuses fall back to Confirmed rather than dropping rows
        assert_eq!(
            PgAppointmentRepository::parse_status("garbage"),
            AppointmentStatus::Confirmed
        );
    }

    #[test]
    fn test_detail_row_builds_patient_name() {
        let now = Utc::now();
        let row = AppointmentDetailRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "09:00".to_string(),
            duration_minutes: 30,
            status: "CONFIRMED".to_string(),
            reason: None,
            notes: None,
            created_at: now,
            updated_at: now,
            patient_first_name: Some("Ada".to_string()),
            patient_last_name: None,
            patient_email: "ada@example.com".to_string(),
            doctor_name: "Dr. Smith".to_string(),
            doctor_email: "smith@example.com".to_string(),
            doctor_image_url: "https://example.com/a.svg".to_string(),
        };

        let detail: AppointmentDetail = row.into();
        assert_eq!(detail.patient_name, "Ada");
        assert_eq!(detail.doctor_name, "Dr. Smith");
    }
}
