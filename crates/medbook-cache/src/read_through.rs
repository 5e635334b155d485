//! Read-through caching with explicit invalidation
//!
//! Cache-aside with short TTLs: list endpoints populate the cache on a read
//! miss, and every mutation that could change a cached result deletes the
//! affected keys synchronously before its response is returned. TTL is only
//! the safety net against missed invalidations.
//!
//! Cache availability is soft on both paths: a store error during a read is
//! treated as a miss, and a failed invalidation is logged rather than
//! failing the mutation — readers must always be able to recompute.

use medbook_core::error::AppError;
use medbook_core::traits::StateStore;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, warn};

/// Return the cached value for `key`, or compute, store, and return it
///
/// `compute` is only invoked on a miss. Store errors never surface to the
/// caller; only `compute` failures do.
pub async fn read_through<S, T, F, Fut>(
    store: &S,
    key: &str,
    ttl_secs: u64,
    compute: F,
) -> Result<T, AppError>
where
    S: StateStore + ?Sized,
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    match store.get::<T>(key).await {
        Ok(Some(value)) => {
            debug!("Cache HIT: {}", key);
            return Ok(value);
        }
        Ok(None) => {
            debug!("Cache MISS: {}", key);
        }
        Err(e) => {
            warn!("Cache read failed for {}: {}", key, e);
        }
    }

    let value = compute().await?;

    if let Err(e) = store.set(key, &value, ttl_secs).await {
        warn!("Failed to cache {}: {}", key, e);
    }

    Ok(value)
}

/// Delete a cache entry; a no-op for absent keys
///
/// Best-effort: a store failure is logged and swallowed, with the entry's
/// TTL as the staleness backstop.
pub async fn invalidate<S: StateStore + ?Sized>(store: &S, key: &str) {
    match store.delete(key).await {
        Ok(deleted) => {
            debug!("Invalidated {} (was present: {})", key, deleted);
        }
        Err(e) => {
            warn!("Failed to invalidate {}: {}", key, e);
        }
    }
}

/// Delete several cache entries
pub async fn invalidate_all<S: StateStore + ?Sized>(store: &S, keys: &[String]) {
    for key in keys {
        invalidate(store, key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_miss_computes_and_populates() {
        let store = MemoryStore::new();
        let calls = AtomicU32::new(0);

        let value = read_through(&store, "k", 30, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(vec!["a".to_string(), "b".to_string()])
        })
        .await
        .unwrap();

        assert_eq!(value, vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let store = MemoryStore::new();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = read_through(&store, "k", 30, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AppError>(7_u32)
            })
            .await
            .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let store = MemoryStore::new();
        let calls = AtomicU32::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(1_u32)
        };

        read_through(&store, "k", 30, compute).await.unwrap();
        invalidate(&store, "k").await;
        read_through(&store, "k", 30, compute).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_is_noop() {
        let store = MemoryStore::new();

        // Must not panic or error
        invalidate(&store, "nothing-here").await;
        invalidate_all(
            &store,
            &["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .await;
    }

    #[tokio::test]
    async fn test_compute_error_propagates() {
        let store = MemoryStore::new();

        let result: Result<u32, _> = read_through(&store, "k", 30, || async {
            Err(AppError::Database("boom".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert!(!store.exists("k").await.unwrap());
    }
}
