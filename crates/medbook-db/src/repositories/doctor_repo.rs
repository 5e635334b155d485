//! Doctor repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medbook_core::{
    models::{Doctor, Gender},
    traits::DoctorRepository,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of DoctorRepository
pub struct PgDoctorRepository {
    pool: PgPool,
}

impl PgDoctorRepository {
    /// Create a new doctor repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse gender from string
    fn parse_gender(s: &str) -> Gender {
        Gender::from_str(s).unwrap_or(Gender::Male)
    }
}

#[async_trait]
impl DoctorRepository for PgDoctorRepository {
    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Doctor) -> AppResult<Doctor> {
        debug!("Creating doctor: {}", entity.name);

        let row = sqlx::query_as::<sqlx::Postgres, DoctorRow>(
            r#"
            INSERT INTO doctors (
                id, name, email, phone, speciality,
                bio, image_url, gender, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, name, email, phone, speciality,
                bio, image_url, gender, is_active,
                created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.email)
        .bind(&entity.phone)
        .bind(&entity.speciality)
        .bind(&entity.bio)
        .bind(&entity.image_url)
        .bind(entity.gender.to_string())
        .bind(entity.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating doctor: {}", e);
            AppError::Database(format!("Failed to create doctor: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Doctor) -> AppResult<Doctor> {
        debug!("Updating doctor: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, DoctorRow>(
            r#"
            UPDATE doctors
            SET name = $2,
                email = $3,
                phone = $4,
                speciality = $5,
                bio = $6,
                image_url = $7,
                gender = $8,
                is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, name, email, phone, speciality,
                bio, image_url, gender, is_active,
                created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.email)
        .bind(&entity.phone)
        .bind(&entity.speciality)
        .bind(&entity.bio)
        .bind(&entity.image_url)
        .bind(entity.gender.to_string())
        .bind(entity.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating doctor {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update doctor: {}", e))
        })?
        .ok_or_else(|| AppError::DoctorNotFound(entity.id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Doctor>> {
        debug!("Finding doctor by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, DoctorRow>(
            r#"
            SELECT
                id, name, email, phone, speciality,
                bio, image_url, gender, is_active,
                created_at, updated_at
            FROM doctors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding doctor {}: {}", id, e);
            AppError::Database(format!("Failed to find doctor: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_with_counts(&self) -> AppResult<Vec<(Doctor, i64)>> {
        debug!("Listing doctors with appointment counts");

        let rows = sqlx::query_as::<sqlx::Postgres, DoctorWithCountRow>(
            r#"
            SELECT
                d.id, d.name, d.email, d.phone, d.speciality,
                d.bio, d.image_url, d.gender, d.is_active,
                d.created_at, d.updated_at,
                COUNT(a.id) AS appointment_count
            FROM doctors d
            LEFT JOIN appointments a ON a.doctor_id = d.id
            GROUP BY d.id
            ORDER BY d.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing doctors: {}", e);
            AppError::Database(format!("Failed to list doctors: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let count = row.appointment_count;
                (row.into(), count)
            })
            .collect())
    }
}

/// Helper struct for mapping doctor rows
#[derive(Debug, sqlx::FromRow)]
struct DoctorRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    speciality: String,
    bio: Option<String>,
    image_url: String,
    gender: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            speciality: row.speciality,
            bio: row.bio,
            image_url: row.image_url,
            gender: PgDoctorRepository::parse_gender(&row.gender),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Doctor row joined with its appointment count
#[derive(Debug, sqlx::FromRow)]
struct DoctorWithCountRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    speciality: String,
    bio: Option<String>,
    image_url: String,
    gender: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    appointment_count: i64,
}

impl From<DoctorWithCountRow> for Doctor {
    fn from(row: DoctorWithCountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            speciality: row.speciality,
            bio: row.bio,
            image_url: row.image_url,
            gender: PgDoctorRepository::parse_gender(&row.gender),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gender() {
        assert_eq!(PgDoctorRepository::parse_gender("MALE"), Gender::Male);
        assert_eq!(PgDoctorRepository::parse_gender("FEMALE"), Gender::Female);
        assert_eq!(PgDoctorRepository::parse_gender("unknown"), Gender::Male);
    }
}
