//! In-memory state store
//!
//! A process-local `StateStore` for tests and single-instance development
//! runs. Entries carry the same TTL semantics as Redis: an expired key reads
//! back as absent. Expiry is lazy; keys are evicted when touched.

use async_trait::async_trait;
use medbook_core::error::AppError;
use medbook_core::traits::StateStore;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    json: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// HashMap-backed state store with lazy TTL eviction
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().expect("memory store lock poisoned");
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the store holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force-expire a key, simulating natural TTL expiry in tests
    pub fn expire_now(&self, key: &str) {
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now());
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("memory store lock poisoned");

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => {
                let value = serde_json::from_str::<T>(&entry.json).map_err(|e| {
                    AppError::Serialization(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Serialization(format!("Serialization failed: {}", e)))?;

        let expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));

        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        entries.insert(key.to_string(), Entry { json, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("memory store lock poisoned");

        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("memory store lock poisoned");

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();

        store.set("k", &42_u32, 60).await.unwrap();
        assert_eq!(store.get::<u32>("k").await.unwrap(), Some(42));
        assert!(store.exists("k").await.unwrap());

        assert!(store.delete("k").await.unwrap());
        assert_eq!(store.get::<u32>("k").await.unwrap(), None);
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_key_reads_absent() {
        let store = MemoryStore::new();

        store.set("k", &"v", 300).await.unwrap();
        store.expire_now("k");

        assert_eq!(store.get::<String>("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_value() {
        let store = MemoryStore::new();

        store.set("k", &1_u32, 60).await.unwrap();
        store.set("k", &2_u32, 60).await.unwrap();

        assert_eq!(store.get::<u32>("k").await.unwrap(), Some(2));
        assert_eq!(store.len(), 1);
    }
}
