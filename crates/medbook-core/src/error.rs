//! Unified error handling for MedBook
//!
//! This module provides a single error type covering every failure scenario
//! in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    // ==================== State Store Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    #[error("State store unavailable: {0}")]
    StoreUnavailable(String),

    // ==================== Authorization Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ==================== Booking Errors ====================
    #[error("A booking request is already being processed. Please wait.")]
    BookingInProgress,

    #[error("This time slot is already booked with this doctor. Please choose another time.")]
    SlotTaken,

    #[error("You already have an appointment with this doctor at this time.")]
    DuplicateBooking,

    #[error("You already have an appointment with Dr. {doctor_name} at this time. Please choose a different time slot.")]
    ScheduleConflict { doctor_name: String },

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Doctor is not available for appointments")]
    DoctorInactive(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    // ==================== Traffic Shaping ====================
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: u64,
        limit: u32,
        reset_at_ms: i64,
    },

    #[error("Operation timed out during {phase}")]
    Timeout { phase: &'static str },

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ==================== External Service Errors ====================
    #[error("Email delivery failed: {0}")]
    Email(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::DoctorNotFound(_)
            | AppError::AppointmentNotFound(_)
            | AppError::UserNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::BookingInProgress
            | AppError::SlotTaken
            | AppError::DuplicateBooking
            | AppError::ScheduleConflict { .. } => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::DoctorInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::BookingInProgress => "booking_in_progress",
            AppError::SlotTaken => "slot_taken",
            AppError::DuplicateBooking => "duplicate_booking",
            AppError::ScheduleConflict { .. } => "schedule_conflict",
            AppError::DoctorNotFound(_) => "doctor_not_found",
            AppError::DoctorInactive(_) => "doctor_inactive",
            AppError::AppointmentNotFound(_) => "appointment_not_found",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Timeout { .. } => "timeout",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Email(_) => "email_error",
        }
    }

    /// Whether the caller may retry the same request unchanged
    ///
    /// Conflict-family errors are terminal for the attempt; timeouts and
    /// store outages are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout { .. } | AppError::StoreUnavailable(_) | AppError::Pool(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut builder = HttpResponse::build(status);

        // Rate-limit rejections carry the standard quota headers alongside
        // the Retry-After guidance.
        if let AppError::RateLimited {
            retry_after_secs,
            limit,
            reset_at_ms,
            ..
        } = self
        {
            let reset = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(*reset_at_ms)
                .unwrap_or_default();
            builder.insert_header(("Retry-After", retry_after_secs.to_string()));
            builder.insert_header(("X-RateLimit-Limit", limit.to_string()));
            builder.insert_header(("X-RateLimit-Remaining", "0"));
            builder.insert_header(("X-RateLimit-Reset", reset.to_rfc3339()));

            return builder.json(json!({
                "error": self.error_code(),
                "message": self.to_string(),
                "status": status.as_u16(),
                "retryAfter": retry_after_secs,
            }));
        }

        builder.json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
