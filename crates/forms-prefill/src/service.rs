//! Prefill Service
//!
//! Resolves default values for fields from one of three sources:
//!
//! | Source     | Reads                                      |
//! |------------|--------------------------------------------|
//! | `internal` | dot-path into the service context object   |
//! | `api`      | HTTP GET, cached, retried with backoff     |
//! | `lookup`   | static table registered by name            |
//!
//! Failures are returned as data. A configured fallback value turns a
//! failure into a success sourced from `<source>_fallback`.

use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use forms_schema::{DataSource, Field, Form, PrefillConfig};

use crate::cache::PrefillCache;
use crate::context::lookup_path;
use crate::error::{PrefillError, Result};
use crate::fetcher::{HttpFetcher, ReqwestFetcher};

/// Attempts made when a config does not set `retryAttempts`
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

// =============================================================================
// Options & Results
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillOptions {
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Backoff unit in milliseconds; attempt `n` waits `2^n` units
    pub backoff_base_ms: u64,
    /// TTL in seconds for configs that do not set `cacheDuration`
    pub default_cache_ttl_secs: u64,
}

impl Default for PrefillOptions {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            backoff_base_ms: 1000,
            default_cache_ttl_secs: 300,
        }
    }
}

impl PrefillOptions {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.default_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `internal`, `api`, `lookup`, or `<source>_fallback`
    pub source: String,
    pub cached: bool,
}

impl PrefillResult {
    fn resolved(source: DataSource, value: Value, cached: bool) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            source: source.to_string(),
            cached,
        }
    }

    fn failed(source: impl Into<String>, error: &PrefillError) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error.to_string()),
            source: source.into(),
            cached: false,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct PrefillService {
    options: PrefillOptions,
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<PrefillCache>,
    context: RwLock<Value>,
    lookups: RwLock<HashMap<String, Value>>,
}

impl PrefillService {
    /// Service backed by a reqwest client
    pub fn new(options: PrefillOptions) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(options.request_timeout())?;
        Ok(Self::with_fetcher(options, Arc::new(fetcher)))
    }

    pub fn with_fetcher(options: PrefillOptions, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            options,
            fetcher,
            cache: Arc::new(PrefillCache::new()),
            context: RwLock::new(Value::Object(Map::new())),
            lookups: RwLock::new(HashMap::new()),
        }
    }

    /// Share a cache between services
    pub fn with_cache(mut self, cache: Arc<PrefillCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<PrefillCache> {
        &self.cache
    }

    pub fn options(&self) -> &PrefillOptions {
        &self.options
    }

    /// Replace the object `internal` sources read from
    pub fn set_context(&self, context: Value) {
        *self.context.write() = context;
    }

    pub fn register_lookup(&self, name: impl Into<String>, table: Value) {
        self.lookups.write().insert(name.into(), table);
    }

    pub async fn prefill_field(&self, field: &Field, context_key: Option<&str>) -> PrefillResult {
        match &field.prefill_config {
            Some(config) => self.resolve(config, context_key).await,
            None => PrefillResult::failed("none", &PrefillError::NotConfigured),
        }
    }

    /// Prefill every configured field concurrently; keyed by field ID
    pub async fn prefill_form(
        &self,
        form: &Form,
        context_key: Option<&str>,
    ) -> HashMap<String, PrefillResult> {
        let pending: Vec<_> = form
            .fields()
            .filter_map(|field| {
                let config = field.prefill_config.as_ref()?;
                Some(async move { (field.id.clone(), self.resolve(config, context_key).await) })
            })
            .collect();

        let results: HashMap<String, PrefillResult> = join_all(pending).await.into_iter().collect();
        info!(
            fields = results.len(),
            resolved = results.values().filter(|r| r.success).count(),
            "form prefill complete"
        );
        results
    }

    /// Resolve one config, applying the fallback on failure
    pub async fn resolve(&self, config: &PrefillConfig, context_key: Option<&str>) -> PrefillResult {
        let result = match config.source {
            DataSource::Internal => self.from_context(config).map(|v| (v, false)),
            DataSource::Lookup => self.from_lookup(config).map(|v| (v, false)),
            DataSource::Api => self.from_api(config, context_key).await,
        };

        match result {
            Ok((value, cached)) => PrefillResult::resolved(config.source, value, cached),
            Err(e) => match &config.fallback_value {
                Some(fallback) => {
                    debug!(source = %config.source, error = %e, "prefill failed, using fallback");
                    PrefillResult {
                        success: true,
                        value: Some(fallback.clone()),
                        error: None,
                        source: format!("{}_fallback", config.source),
                        cached: false,
                    }
                }
                None => {
                    warn!(source = %config.source, error = %e, "prefill failed");
                    PrefillResult::failed(config.source.to_string(), &e)
                }
            },
        }
    }

    fn from_context(&self, config: &PrefillConfig) -> Result<Value> {
        let path = non_empty(config.key.as_deref())
            .ok_or(PrefillError::Incomplete { origin: "internal", what: "a key" })?;
        let context = self.context.read();
        lookup_path(&context, path)
            .cloned()
            .ok_or_else(|| PrefillError::MissingContextValue(path.to_string()))
    }

    fn from_lookup(&self, config: &PrefillConfig) -> Result<Value> {
        let name = non_empty(config.key.as_deref())
            .ok_or(PrefillError::Incomplete { origin: "lookup", what: "a key" })?;
        self.lookups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PrefillError::UnknownLookup(name.to_string()))
    }

    async fn from_api(&self, config: &PrefillConfig, context_key: Option<&str>) -> Result<(Value, bool)> {
        let endpoint = non_empty(config.endpoint.as_deref())
            .ok_or(PrefillError::Incomplete { origin: "api", what: "an endpoint" })?;
        let url = substitute_id(endpoint, context_key)?;

        let use_cache = config.cache.unwrap_or(true);
        let cache_key =
            PrefillCache::key(config.source, config.key.as_deref(), Some(endpoint), context_key);
        if use_cache {
            if let Some(value) = self.cache.get(&cache_key) {
                return Ok((value, true));
            }
        }

        let attempts = config.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS).max(1);
        let response = self.fetch_with_retry(&url, attempts).await?;
        let value = apply_mapping(response, &config.field_mapping);

        if use_cache {
            let ttl = config
                .cache_duration
                .map(Duration::from_secs)
                .unwrap_or_else(|| self.options.default_cache_ttl());
            self.cache.insert(cache_key, value.clone(), ttl);
        }
        Ok((value, false))
    }

    async fn fetch_with_retry(&self, url: &str, attempts: u32) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.fetcher.get_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.options.backoff_base().saturating_mul(2u32.saturating_pow(attempt));
                    warn!(url, attempt = attempt + 1, attempts, ?delay, error = %e, "prefill request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Replace `:id` with the context key
fn substitute_id(endpoint: &str, context_key: Option<&str>) -> Result<String> {
    if !endpoint.contains(":id") {
        return Ok(endpoint.to_string());
    }
    match context_key {
        Some(id) => Ok(endpoint.replace(":id", id)),
        None => Err(PrefillError::MissingContextKey(endpoint.to_string())),
    }
}

/// Project `response[from]` into `out[to]` for each mapping entry
fn apply_mapping(response: Value, mapping: &BTreeMap<String, String>) -> Value {
    if mapping.is_empty() {
        return response;
    }
    let Value::Object(source) = response else {
        return response;
    };
    let mapped: Map<String, Value> = mapping
        .iter()
        .filter_map(|(from, to)| source.get(from).map(|v| (to.clone(), v.clone())))
        .collect();
    Value::Object(mapped)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays scripted responses and records every URL requested
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Value>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl HttpFetcher for ScriptedFetcher {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.requests.lock().push(url.to_string());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(PrefillError::Status { status: 500, url: url.to_string() }))
        }
    }

    fn server_error() -> Result<Value> {
        Err(PrefillError::Status { status: 500, url: "test".into() })
    }

    fn api_config(endpoint: &str) -> PrefillConfig {
        PrefillConfig {
            endpoint: Some(endpoint.into()),
            retry_attempts: Some(3),
            ..PrefillConfig::new(DataSource::Api)
        }
    }

    fn service(fetcher: Arc<ScriptedFetcher>) -> PrefillService {
        PrefillService::with_fetcher(PrefillOptions::default(), fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_retries_with_backoff() {
        let fetcher = ScriptedFetcher::new(vec![server_error(), server_error(), server_error()]);
        let svc = service(fetcher.clone());

        let started = Instant::now();
        let result = svc.resolve(&api_config("https://api.test/loans/:id"), Some("7")).await;

        assert!(!result.success);
        assert_eq!(result.source, "api");
        assert!(result.error.unwrap().contains("500"));
        assert_eq!(fetcher.requests().len(), 3);
        assert_eq!(fetcher.requests()[0], "https://api.test/loans/7");
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_millis(3100), "{:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_fallback() {
        let fetcher = ScriptedFetcher::new(vec![server_error(), server_error(), server_error()]);
        let svc = service(fetcher.clone());
        let config = PrefillConfig {
            fallback_value: Some(json!("N/A")),
            ..api_config("https://api.test/rates")
        };

        let result = svc.resolve(&config, None).await;
        assert!(result.success);
        assert_eq!(result.source, "api_fallback");
        assert_eq!(result.value, Some(json!("N/A")));
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(PrefillError::Status { status: 404, url: "x".into() })]);
        let svc = service(fetcher.clone());
        let result = svc.resolve(&api_config("https://api.test/rates"), None).await;
        assert!(!result.success);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_cache_ttl() {
        let fetcher = ScriptedFetcher::new(vec![Ok(json!({ "rate": 6.5 })), Ok(json!({ "rate": 6.75 }))]);
        let svc = service(fetcher.clone());
        let config = PrefillConfig {
            cache_duration: Some(60),
            ..api_config("https://api.test/rates")
        };

        let first = svc.resolve(&config, None).await;
        assert!(first.success && !first.cached);

        let second = svc.resolve(&config, None).await;
        assert!(second.cached);
        assert_eq!(second.value, Some(json!({ "rate": 6.5 })));
        assert_eq!(fetcher.requests().len(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = svc.resolve(&config, None).await;
        assert!(!third.cached);
        assert_eq!(third.value, Some(json!({ "rate": 6.75 })));
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_cache_duration() {
        let fetcher = ScriptedFetcher::new(vec![Ok(json!(6.5))]);
        let svc = service(fetcher.clone());
        let config = PrefillConfig {
            cache_duration: Some(u64::MAX),
            ..api_config("https://api.test/rates")
        };

        let first = svc.resolve(&config, None).await;
        assert!(first.success);
        assert_eq!(first.value, Some(json!(6.5)));

        let second = svc.resolve(&config, None).await;
        assert!(second.cached);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_and_field_mapping() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(json!({ "first_name": "Ada", "ignored": true })),
            Ok(json!({ "first_name": "Ada" })),
        ]);
        let svc = service(fetcher.clone());
        let mut config = api_config("https://api.test/people/:id");
        config.cache = Some(false);
        config.field_mapping.insert("first_name".into(), "borrower_name".into());

        let result = svc.resolve(&config, Some("1")).await;
        assert_eq!(result.value, Some(json!({ "borrower_name": "Ada" })));
        svc.resolve(&config, Some("1")).await;
        assert_eq!(fetcher.requests().len(), 2);
        assert!(svc.cache().is_empty());
    }

    #[test]
    fn test_missing_context_key() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let svc = service(fetcher.clone());
        let result = tokio_test::block_on(svc.resolve(&api_config("https://api.test/people/:id"), None));
        assert!(!result.success);
        assert!(result.error.unwrap().contains(":id"));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_internal_and_lookup_sources() {
        let svc = service(ScriptedFetcher::new(vec![]));
        svc.set_context(json!({ "user": { "email": "ada@example.com" } }));
        svc.register_lookup("states", json!(["CA", "NY"]));

        let internal = PrefillConfig { key: Some("user.email".into()), ..PrefillConfig::new(DataSource::Internal) };
        let result = svc.resolve(&internal, None).await;
        assert_eq!(result.value, Some(json!("ada@example.com")));
        assert_eq!(result.source, "internal");

        let missing = PrefillConfig { key: Some("user.phone".into()), ..PrefillConfig::new(DataSource::Internal) };
        assert!(!svc.resolve(&missing, None).await.success);

        let lookup = PrefillConfig { key: Some("states".into()), ..PrefillConfig::new(DataSource::Lookup) };
        assert_eq!(svc.resolve(&lookup, None).await.value, Some(json!(["CA", "NY"])));

        let unknown = PrefillConfig {
            key: Some("counties".into()),
            fallback_value: Some(json!([])),
            ..PrefillConfig::new(DataSource::Lookup)
        };
        let result = svc.resolve(&unknown, None).await;
        assert!(result.success);
        assert_eq!(result.source, "lookup_fallback");
    }

    #[tokio::test]
    async fn test_prefill_form() {
        let form_json = json!({
            "pages": [{ "id": "p1", "sections": [{ "id": "s1", "fields": [
                { "id": "email", "field_type": "email",
                  "prefill_config": { "source": "internal", "key": "user.email" } },
                { "id": "rate", "field_type": "percentage",
                  "prefill_config": { "source": "api", "endpoint": "https://api.test/rate" } },
                { "id": "notes", "field_type": "textarea" }
            ] }] }]
        });
        let form = forms_schema::validate_form_structure(&form_json).into_result().unwrap();
        let svc = service(ScriptedFetcher::new(vec![Ok(json!(6.5))]));
        svc.set_context(json!({ "user": { "email": "ada@example.com" } }));

        let results = svc.prefill_form(&form, None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results["email"].value, Some(json!("ada@example.com")));
        assert_eq!(results["rate"].value, Some(json!(6.5)));

        let notes = form.field("notes").unwrap();
        assert!(!svc.prefill_field(notes, None).await.success);
    }
}
