//! Prefill value cache
//!
//! Entries expire lazily: an expired entry is dropped when it is next read.
//! Nothing sweeps in the background.

use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use forms_schema::DataSource;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    /// `None` when the TTL reaches past what the clock can represent
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
pub struct PrefillCache {
    entries: DashMap<String, CacheEntry>,
}

impl PrefillCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a resolution: `source:key:endpoint:contextKey`
    pub fn key(
        source: DataSource,
        key: Option<&str>,
        endpoint: Option<&str>,
        context_key: Option<&str>,
    ) -> String {
        format!(
            "{}:{}:{}:{}",
            source,
            key.unwrap_or_default(),
            endpoint.unwrap_or_default(),
            context_key.unwrap_or_default()
        )
    }

    /// Live value for `key`, dropping it if expired
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                debug!(key, "prefill cache hit");
                return Some(entry.value.clone());
            }
        }
        if self.entries.remove_if(key, |_, e| !e.is_live(now)).is_some() {
            debug!(key, "prefill cache entry expired");
        }
        None
    }

    pub fn insert(&self, key: String, value: Value, ttl: Duration) {
        let entry = CacheEntry { value, expires_at: Instant::now().checked_add(ttl) };
        self.entries.insert(key, entry);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every entry whose key contains `pattern`; returns how many
    pub fn clear_matching(&self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        before.saturating_sub(self.entries.len())
    }

    /// Entries held, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        let key = PrefillCache::key(DataSource::Api, None, Some("/users/:id"), Some("42"));
        assert_eq!(key, "api::/users/:id:42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_on_read() {
        let cache = PrefillCache::new();
        cache.insert("a".into(), json!(1), Duration::from_secs(10));
        assert_eq!(cache.get("a"), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_ttl_never_expires() {
        let cache = PrefillCache::new();
        cache.insert("forever".into(), json!("v"), Duration::from_secs(u64::MAX));

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(cache.get("forever"), Some(json!("v")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_matching() {
        let cache = PrefillCache::new();
        let ttl = Duration::from_secs(60);
        cache.insert("api::/users/:id:1".into(), json!("a"), ttl);
        cache.insert("api::/users/:id:2".into(), json!("b"), ttl);
        cache.insert("api::/orgs/:id:1".into(), json!("c"), ttl);

        assert_eq!(cache.clear_matching("/users/"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
