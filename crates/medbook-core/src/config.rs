//! Application configuration
//!
//! This module provides centralized configuration management using the
//! `config` crate. Configuration can be loaded from environment variables
//! and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
    pub mailer: MailerConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma-separated allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
}

/// Booking pipeline configuration
///
/// Deadlines bound each phase of a booking attempt so worst-case latency
/// is the sum of three bounded phases, never unbounded.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Booking lock TTL in seconds (safety net for crashed holders)
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Deadline for the doctor lookup phase in seconds
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Shared deadline for the parallel conflict checks in seconds
    #[serde(default = "default_conflict_timeout")]
    pub conflict_timeout_secs: u64,

    /// Deadline for the appointment create call in seconds
    #[serde(default = "default_create_timeout")]
    pub create_timeout_secs: u64,

    /// Default appointment duration in minutes
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i32,
}

fn default_lock_ttl() -> u64 {
    30
}

fn default_lookup_timeout() -> u64 {
    5
}

fn default_conflict_timeout() -> u64 {
    10
}

fn default_create_timeout() -> u64 {
    5
}

fn default_duration_minutes() -> i32 {
    30
}

/// Transactional email configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MailerConfig {
    /// Email API endpoint
    #[serde(default = "default_mailer_api_url")]
    pub api_url: String,

    /// API key; when absent, delivery is skipped (development mode)
    #[serde(default)]
    pub api_key: Option<String>,

    /// From address for outbound mail
    #[serde(default = "default_mail_from")]
    pub from: String,

    /// Admin email; also the development-mode delivery override
    #[serde(default)]
    pub admin_email: Option<String>,
}

fn default_mailer_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_mail_from() -> String {
    "MedBook <onboarding@resend.dev>".to_string()
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default(
                "server.cors_origins",
                "http://localhost:3000,http://127.0.0.1:3000",
            )?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("booking.lock_ttl_secs", 30)?
            .set_default("booking.lookup_timeout_secs", 5)?
            .set_default("booking.conflict_timeout_secs", 10)?
            .set_default("booking.create_timeout_secs", 5)?
            .set_default("booking.default_duration_minutes", 30)?
            .set_default("mailer.api_url", "https://api.resend.com/emails")?
            .set_default("mailer.from", "MedBook <onboarding@resend.dev>")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with MEDBOOK_ prefix
            .add_source(
                Environment::with_prefix("MEDBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("MEDBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 30,
            lookup_timeout_secs: 5,
            conflict_timeout_secs: 10,
            create_timeout_secs: 5,
            default_duration_minutes: 30,
        }
    }
}
