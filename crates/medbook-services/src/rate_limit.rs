//! Fixed-window rate limiting over the shared state store
//!
//! Counters live in the key-value store rather than process memory, so
//! limits hold across concurrently running service instances. Each window is
//! one entry keyed by route and caller, with TTL recomputed on every write
//! so the entry never outlives its own window.
//!
//! Availability is prioritized over strict quota enforcement: if the store
//! is unreachable the limiter fails open, admitting the request and logging
//! the error.

use chrono::{DateTime, Utc};
use medbook_cache::keys;
use medbook_core::{traits::StateStore, AppError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One fixed window's counter state
///
/// `reset_time` is fixed for the life of the window; counted requests never
/// extend it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateWindow {
    count: u32,
    reset_time: i64,
}

/// Named (max, window) pairing for a class of routes
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPreset {
    /// Preset name, for logs
    pub name: &'static str,

    /// Maximum requests admitted per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,

    /// Key by network origin instead of caller identity
    pub per_origin: bool,

    /// Override for the rejection message
    pub message: Option<&'static str>,
}

impl RateLimitPreset {
    /// The rejection message shown to the caller
    pub fn rejection_message(&self) -> String {
        match self.message {
            Some(custom) => custom.to_string(),
            None => format!(
                "Too many requests. Maximum {} requests per {} seconds allowed.",
                self.max_requests, self.window_secs
            ),
        }
    }
}

/// Sensitive mutating actions
pub const STRICT: RateLimitPreset = RateLimitPreset {
    name: "strict",
    max_requests: 5,
    window_secs: 900,
    per_origin: false,
    message: Some("Too many attempts. Please try again in 15 minutes."),
};

/// Routine writes
pub const MODERATE: RateLimitPreset = RateLimitPreset {
    name: "moderate",
    max_requests: 30,
    window_secs: 60,
    per_origin: false,
    message: None,
};

/// Routine reads
pub const LENIENT: RateLimitPreset = RateLimitPreset {
    name: "lenient",
    max_requests: 100,
    window_secs: 60,
    per_origin: false,
    message: None,
};

/// Pre-authentication routes, keyed by network origin
pub const PER_ORIGIN: RateLimitPreset = RateLimitPreset {
    name: "per_origin",
    max_requests: 20,
    window_secs: 60,
    per_origin: true,
    message: None,
};

/// Outcome of an admission check
#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// The preset's request ceiling
    pub limit: u32,

    /// Requests left in the current window
    pub remaining: u32,

    /// When the current window resets, epoch milliseconds
    pub reset_at_ms: i64,

    /// Seconds until retry is worthwhile; set only on rejection
    pub retry_after_secs: Option<u64>,
}

impl AdmissionDecision {
    /// Window reset instant
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.reset_at_ms).unwrap_or_default()
    }

    /// Convert a rejection into the typed error carrying retry guidance
    pub fn into_error(self, preset: &RateLimitPreset) -> AppError {
        AppError::RateLimited {
            message: preset.rejection_message(),
            retry_after_secs: self.retry_after_secs.unwrap_or(1),
            limit: self.limit,
            reset_at_ms: self.reset_at_ms,
        }
    }
}

/// Resolve the counter identity for a caller
///
/// Prefers the authenticated user id; falls back to the forwarded network
/// origin, then to a shared `unknown` bucket. Per-origin presets always key
/// by origin, deliberately ignoring caller identity.
pub fn client_key(
    user_id: Option<&str>,
    origin: Option<&str>,
    preset: &RateLimitPreset,
) -> String {
    if preset.per_origin {
        return format!("ip:{}", origin.unwrap_or("unknown"));
    }

    match user_id {
        Some(id) => id.to_string(),
        None => format!("ip:{}", origin.unwrap_or("unknown")),
    }
}

/// Fixed-window rate limiter over a shared state store
pub struct RateLimiter<S> {
    store: Arc<S>,
}

impl<S: StateStore> RateLimiter<S> {
    /// Create a new rate limiter
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Admit or reject one request for `route_key` + `client_id`
    ///
    /// Never returns an error: store failures admit the request (fail open).
    pub async fn admit(
        &self,
        route_key: &str,
        client_id: &str,
        preset: &RateLimitPreset,
    ) -> AdmissionDecision {
        let key = keys::rate_limit_key(route_key, client_id);
        let now = Utc::now().timestamp_millis();

        let existing: Option<RateWindow> = match self.store.get(&key).await {
            Ok(window) => window,
            Err(e) => {
                error!("Rate limiter store read failed for {}: {}", key, e);
                return self.fresh_window(&key, now, preset, false).await;
            }
        };

        match existing {
            None => self.fresh_window(&key, now, preset, true).await,

            // Window elapsed while the entry survived in the store; start a
            // fresh window unconditionally.
            Some(window) if now >= window.reset_time => {
                self.fresh_window(&key, now, preset, true).await
            }

            Some(window) if window.count >= preset.max_requests => {
                let retry_after = ceil_secs(window.reset_time - now);
                warn!(
                    "Rate limit exceeded for {} ({} preset, count {})",
                    key, preset.name, window.count
                );
                AdmissionDecision {
                    allowed: false,
                    limit: preset.max_requests,
                    remaining: 0,
                    reset_at_ms: window.reset_time,
                    retry_after_secs: Some(retry_after),
                }
            }

            Some(window) => {
                let count = window.count + 1;
                let updated = RateWindow {
                    count,
                    reset_time: window.reset_time,
                };
                // TTL shrinks to the remaining window so the entry cannot
                // outlive its own reset boundary.
                let ttl = ceil_secs(window.reset_time - now);
                if let Err(e) = self.store.set(&key, &updated, ttl).await {
                    error!("Rate limiter store write failed for {}: {}", key, e);
                }

                debug!(
                    "Admitted {} ({}/{} in window)",
                    key, count, preset.max_requests
                );
                AdmissionDecision {
                    allowed: true,
                    limit: preset.max_requests,
                    remaining: preset.max_requests.saturating_sub(count),
                    reset_at_ms: window.reset_time,
                    retry_after_secs: None,
                }
            }
        }
    }

    /// Start a new window with count 1; `record` is false on the fail-open
    /// path where the store already proved unreachable.
    async fn fresh_window(
        &self,
        key: &str,
        now: i64,
        preset: &RateLimitPreset,
        record: bool,
    ) -> AdmissionDecision {
        let reset_time = now + preset.window_secs as i64 * 1000;

        if record {
            let window = RateWindow {
                count: 1,
                reset_time,
            };
            if let Err(e) = self.store.set(key, &window, preset.window_secs).await {
                error!("Rate limiter store write failed for {}: {}", key, e);
            }
        }

        AdmissionDecision {
            allowed: true,
            limit: preset.max_requests,
            remaining: preset.max_requests.saturating_sub(1),
            reset_at_ms: reset_time,
            retry_after_secs: None,
        }
    }
}

/// Round a millisecond interval up to whole seconds, minimum 1
fn ceil_secs(interval_ms: i64) -> u64 {
    ((interval_ms.max(0) + 999) / 1000).max(1) as u64
}
