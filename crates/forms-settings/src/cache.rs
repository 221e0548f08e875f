//! Read-through settings cache
//!
//! Entries stay until invalidated; there is no TTL.

use moka::sync::Cache;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SettingsError};
use crate::store::SettingsStore;

const DEFAULT_CAPACITY: u64 = 1024;

pub struct SettingsCache<S> {
    store: S,
    entries: Cache<String, Value>,
}

impl<S: SettingsStore> SettingsCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: S, capacity: u64) -> Self {
        let entries = Cache::builder().max_capacity(capacity).build();
        Self { store, entries }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached value, loading from the store on a miss
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.entries.get(key) {
            debug!(key, "settings cache hit");
            return Ok(Some(value));
        }

        let loaded = self.store.load(key).await?;
        if let Some(value) = &loaded {
            debug!(key, "settings loaded");
            self.entries.insert(key.to_string(), value.clone());
        }
        Ok(loaded)
    }

    /// Typed read
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| SettingsError::Shape { key: key.to_string(), source }),
        }
    }

    /// Upsert through the store, then refresh the cached copy
    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.store.save(key, &value).await?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySettingsStore;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts loads to tell cache hits from store reads
    #[derive(Default)]
    struct CountingStore {
        inner: InMemorySettingsStore,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SettingsStore for CountingStore {
        async fn load(&self, key: &str) -> Result<Option<Value>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, value: &Value) -> Result<()> {
            self.inner.save(key, value).await
        }
    }

    fn seeded() -> CountingStore {
        let mut values = HashMap::new();
        values.insert("branding".to_string(), json!({ "company": "Acme Appraisals", "color": "#0a6" }));
        CountingStore {
            inner: InMemorySettingsStore::with_values(values),
            loads: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_read_through() {
        let cache = SettingsCache::new(seeded());
        assert!(cache.get("branding").await.unwrap().is_some());
        assert!(cache.get("branding").await.unwrap().is_some());
        assert_eq!(cache.store().loads.load(Ordering::SeqCst), 1);

        assert!(cache.get("missing").await.unwrap().is_none());
        assert!(cache.get("missing").await.unwrap().is_none());
        assert_eq!(cache.store().loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_set_and_invalidate() {
        let cache = SettingsCache::new(seeded());
        cache.set("theme", json!("dark")).await.unwrap();
        assert_eq!(cache.get("theme").await.unwrap(), Some(json!("dark")));
        assert_eq!(cache.store().loads.load(Ordering::SeqCst), 0);
        assert_eq!(cache.store().inner.snapshot()["theme"], json!("dark"));

        cache.invalidate("theme");
        assert_eq!(cache.get("theme").await.unwrap(), Some(json!("dark")));
        assert_eq!(cache.store().loads.load(Ordering::SeqCst), 1);

        cache.invalidate_all();
        cache.get("theme").await.unwrap();
        assert_eq!(cache.store().loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_typed_reads() {
        #[derive(Deserialize)]
        struct Branding {
            company: String,
        }

        let cache = SettingsCache::new(seeded());
        let branding: Branding = cache.get_as("branding").await.unwrap().unwrap();
        assert_eq!(branding.company, "Acme Appraisals");

        let wrong = cache.get_as::<Vec<u32>>("branding").await;
        assert!(matches!(wrong, Err(SettingsError::Shape { .. })));
    }
}
