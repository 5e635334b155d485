//! Distributed booking lock
//!
//! A short-lived mutual-exclusion token scoped per (caller, date, time),
//! held in the shared state store for the duration of one booking attempt.
//! It collapses duplicate rapid-fire submissions from a single caller; the
//! durable conflict checks remain the authority for cross-caller contention.
//!
//! Acquisition is get-then-set, not an atomic compare-and-swap: a concurrent
//! acquirer can slip between the two calls. The conflict detector re-validates
//! against durable state before any write, so the lock is a throughput
//! optimization rather than the correctness mechanism.

use chrono::NaiveDate;
use medbook_cache::keys;
use medbook_core::{traits::StateStore, AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Booking lock over a shared state store
pub struct BookingLock<S> {
    store: Arc<S>,
    ttl_secs: u64,
}

impl<S: StateStore> BookingLock<S> {
    /// Create a lock with the default 30-second TTL
    pub fn new(store: Arc<S>) -> Self {
        Self::with_ttl(store, keys::BOOKING_LOCK_TTL_SECS)
    }

    /// Create a lock with a custom TTL
    pub fn with_ttl(store: Arc<S>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Try to acquire the lock for one caller's slot
    ///
    /// Returns the lock key to release later.
    ///
    /// # Errors
    ///
    /// - `AppError::BookingInProgress` if the lock is already held
    /// - `AppError::StoreUnavailable` if the store is unreachable; the
    ///   attempt fails closed rather than proceeding unlocked
    pub async fn acquire(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> AppResult<String> {
        let key = keys::booking_lock_key(user_id, date, time);

        let held: Option<bool> = self.store.get(&key).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Lock acquisition failed: {}", e))
        })?;

        if held.is_some() {
            warn!("Booking request already in progress for {}", key);
            return Err(AppError::BookingInProgress);
        }

        self.store
            .set(&key, &true, self.ttl_secs)
            .await
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Lock acquisition failed: {}", e))
            })?;

        debug!("Acquired booking lock {} (TTL {}s)", key, self.ttl_secs);
        Ok(key)
    }

    /// Release the lock
    ///
    /// Idempotent and best-effort: safe on absent or already-expired keys,
    /// and a store failure is logged rather than propagated. The TTL remains
    /// the cleanup guarantee if release itself fails.
    pub async fn release(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(_) => debug!("Released booking lock {}", key),
            Err(e) => warn!("Failed to release booking lock {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medbook_cache::MemoryStore;
    use serde::{de::DeserializeOwned, Serialize};

    /// Store that fails every operation, simulating an unreachable backend
    struct FailingStore;

    #[async_trait]
    impl StateStore for FailingStore {
        async fn get<T: DeserializeOwned>(&self, _key: &str) -> AppResult<Option<T>> {
            Err(AppError::CacheConnection("connection refused".to_string()))
        }

        async fn set<T: Serialize + Send + Sync>(
            &self,
            _key: &str,
            _value: &T,
            _ttl_secs: u64,
        ) -> AppResult<()> {
            Err(AppError::CacheConnection("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> AppResult<bool> {
            Err(AppError::CacheConnection("connection refused".to_string()))
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Err(AppError::CacheConnection("connection refused".to_string()))
        }
    }

    fn slot() -> (Uuid, NaiveDate, &'static str) {
        (
            Uuid::from_u128(1),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "09:00",
        )
    }

    #[tokio::test]
    async fn test_acquire_then_release_leaves_key_absent() {
        let store = Arc::new(MemoryStore::new());
        let lock = BookingLock::new(store.clone());
        let (user, date, time) = slot();

        let key = lock.acquire(user, date, time).await.unwrap();
        assert!(store.exists(&key).await.unwrap());

        lock.release(&key).await;
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_acquire_is_rejected_while_held() {
        let store = Arc::new(MemoryStore::new());
        let lock = BookingLock::new(store);
        let (user, date, time) = slot();

        let key = lock.acquire(user, date, time).await.unwrap();

        let second = lock.acquire(user, date, time).await;
        assert!(matches!(second, Err(AppError::BookingInProgress)));

        lock.release(&key).await;
        assert!(lock.acquire(user, date, time).await.is_ok());
    }

    #[tokio::test]
    async fn test_different_slots_do_not_contend() {
        let store = Arc::new(MemoryStore::new());
        let lock = BookingLock::new(store);
        let (user, date, _) = slot();

        lock.acquire(user, date, "09:00").await.unwrap();
        lock.acquire(user, date, "10:00").await.unwrap();
        lock.acquire(Uuid::from_u128(2), date, "09:00").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_reacquired() {
        let store = Arc::new(MemoryStore::new());
        let lock = BookingLock::new(store.clone());
        let (user, date, time) = slot();

        let key = lock.acquire(user, date, time).await.unwrap();
        store.expire_now(&key);

        assert!(lock.acquire(user, date, time).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let lock = BookingLock::new(store);
        let (user, date, time) = slot();

        let key = lock.acquire(user, date, time).await.unwrap();
        lock.release(&key).await;
        // Second release of an absent key must not panic or error
        lock.release(&key).await;
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_closed() {
        let lock = BookingLock::new(Arc::new(FailingStore));
        let (user, date, time) = slot();

        let result = lock.acquire(user, date, time).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_release_against_unreachable_store_is_swallowed() {
        let lock = BookingLock::new(Arc::new(FailingStore));
        // Must not panic; failure is logged and the TTL is the backstop
        lock.release("booking:lock:whatever").await;
    }
}
