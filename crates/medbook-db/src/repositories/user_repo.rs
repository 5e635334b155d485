//! User repository implementation
//!
//! Users originate in the external identity provider; the upsert keeps the
//! local row in sync with the profile fields the provider forwards on each
//! request, and handles first-seen and returning users with one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medbook_core::{models::User, traits::UserRepository, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn upsert_by_external_id(
        &self,
        external_id: &str,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<User> {
        debug!("Upserting user with external id: {}", external_id);

        let row = sqlx::query_as::<sqlx::Postgres, UserRow>(
            r#"
            INSERT INTO users (id, external_id, email, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = NOW()
            RETURNING
                id, external_id, email, first_name, last_name,
                created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error upserting user: {}", e);
            AppError::Database(format!("Failed to upsert user: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, UserRow>(
            r#"
            SELECT
                id, external_id, email, first_name, last_name,
                created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding user {}: {}", id, e);
            AppError::Database(format!("Failed to find user: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

/// Helper struct for mapping user rows
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
