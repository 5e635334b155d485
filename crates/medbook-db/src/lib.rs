//! MedBook Database Layer
//!
//! This crate provides PostgreSQL database access and repository
//! implementations for the MedBook backend. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for users, doctors, and appointments
//! - The conflict existence queries the booking pipeline validates against

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use medbook_core::{AppError, AppResult};
pub use sqlx::PgPool;
