//! Session cache for remotely stored global values ("gvars").
//!
//! Alias scripts read named values from a remote customization store. The
//! analysis layer only needs to know whether a gvar exists, so this store
//! keeps a per-session map, filled from local seeds and from at most one
//! remote fetch per key. Fetch failures are never fatal; they surface as a
//! `false` from [`GvarStore::ensure`] and nothing else.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum GvarError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for the customization service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Raw service token, sent in `Authorization` without a scheme prefix.
    pub token: Option<String>,
    pub enable_fetch: bool,
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.wyrm.tools".to_string(),
            token: None,
            enable_fetch: false,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(serde::Deserialize)]
struct GvarPayload {
    value: Option<Value>,
}

pub struct GvarStore {
    config: ServiceConfig,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, Value>>,
}

impl GvarStore {
    pub fn new(config: ServiceConfig) -> Result<Self, GvarError> {
        if config.timeout.is_zero() {
            return Err(GvarError::InvalidConfig("timeout must be > 0".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("wyrm-gvar/0.1.0")
            .build()?;
        Ok(Self {
            config,
            http,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache-only lookup; never touches the network.
    pub fn get_local(&self, key: &str) -> Option<Value> {
        self.locked().get(key).cloned()
    }

    /// Merge entries into the cache without dropping existing keys.
    ///
    /// Used by session rebuilds that must not discard values fetched
    /// earlier in the session.
    pub fn seed(&self, entries: impl IntoIterator<Item = (String, Value)>) {
        let mut cache = self.locked();
        for (key, value) in entries {
            cache.insert(key, value);
        }
    }

    /// Clear the cache, then optionally repopulate it. Always clears,
    /// regardless of prior seeds.
    pub fn reset(&self, entries: Option<HashMap<String, Value>>) {
        let mut cache = self.locked();
        cache.clear();
        if let Some(entries) = entries {
            cache.extend(entries);
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.locked()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Make sure `key` is resolvable, fetching it once if necessary.
    ///
    /// Returns true on a cache hit or a successful fetch. Disabled fetch,
    /// missing token, network failure, non-200 status, and payloads without
    /// a `value` field all return false with no retry and no storage.
    pub async fn ensure(&self, key: &str) -> bool {
        if self.locked().contains_key(key) {
            debug!(key, "gvar ensure cache hit");
            return true;
        }
        if !self.config.enable_fetch {
            warn!(key, "gvar fetch disabled; skipping");
            return false;
        }
        let Some(token) = self.config.token.as_deref() else {
            debug!(key, "gvar fetch skipped: no token configured");
            return false;
        };

        let raw_url = format!(
            "{}/customizations/gvars/{key}",
            self.config.base_url.trim_end_matches('/')
        );
        let url = match Url::parse(&raw_url) {
            Ok(url) => url,
            Err(err) => {
                error!(key, %err, "gvar fetch skipped: bad base url");
                return false;
            }
        };

        debug!(key, %url, "fetching gvar");
        let resp = match self
            .http
            .get(url)
            .header(AUTHORIZATION, token)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                error!(key, %err, "gvar fetch failed");
                return false;
            }
        };

        if resp.status() != StatusCode::OK {
            warn!(key, status = %resp.status(), "gvar fetch returned non-success status");
            return false;
        }

        let value = match resp.json::<GvarPayload>().await {
            Ok(GvarPayload { value: Some(value) }) => value,
            Ok(GvarPayload { value: None }) => {
                error!(key, "gvar payload missing value");
                return false;
            }
            Err(err) => {
                error!(key, %err, "gvar payload was not valid JSON");
                return false;
            }
        };

        self.locked().insert(key.to_string(), value);
        true
    }

    /// Ensure many keys at once, fanning the fetches out and awaiting them
    /// all. Returns one flag per key, in order.
    pub async fn ensure_all(&self, keys: &[String]) -> Vec<bool> {
        future::join_all(keys.iter().map(|key| self.ensure(key))).await
    }

    /// Reset to `seed`, then ensure each of `keys` in order, returning the
    /// resulting snapshot.
    pub async fn refresh(
        &self,
        seed: Option<HashMap<String, Value>>,
        keys: &[String],
    ) -> BTreeMap<String, Value> {
        self.reset(seed);
        for key in keys {
            self.ensure(key).await;
        }
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn store_for(server: &MockServer) -> GvarStore {
        GvarStore::new(ServiceConfig {
            base_url: server.base_url(),
            token: Some("token-123".to_string()),
            enable_fetch: true,
            timeout: Duration::from_millis(500),
        })
        .unwrap()
    }

    fn offline_store() -> GvarStore {
        GvarStore::new(ServiceConfig::default()).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_fetches_once_and_caches() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/customizations/gvars/abc123")
                    .header("authorization", "token-123");
                then.status(200).json_body(json!({ "value": "hello" }));
            })
            .await;

        let store = store_for(&server);
        assert!(store.ensure("abc123").await);
        assert!(store.ensure("abc123").await);
        mock.assert_hits_async(1).await;
        assert_eq!(store.get_local("abc123"), Some(json!("hello")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn non_success_status_is_a_miss() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/customizations/gvars/missing");
                then.status(404).json_body(json!({ "error": "no such gvar" }));
            })
            .await;

        let store = store_for(&server);
        assert!(!store.ensure("missing").await);
        assert_eq!(store.get_local("missing"), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn payload_without_value_is_a_miss() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/customizations/gvars/odd");
                then.status(200).json_body(json!({ "owner": 42 }));
            })
            .await;

        let store = store_for(&server);
        assert!(!store.ensure("odd").await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_responses_time_out_as_misses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/customizations/gvars/slow");
                then.status(200)
                    .json_body(json!({ "value": 1 }))
                    .delay(Duration::from_millis(900));
            })
            .await;

        let store = store_for(&server);
        assert!(!store.ensure("slow").await);
        assert_eq!(store.get_local("slow"), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_disabled_short_circuits() {
        let store = offline_store();
        assert!(!store.ensure("anything").await);
    }

    #[test]
    fn reset_always_clears_prior_seeds() {
        let store = offline_store();
        store.seed([("a".to_string(), json!(1))]);
        store.reset(None);
        assert_eq!(store.get_local("a"), None);
    }

    #[test]
    fn seed_merges_without_evicting() {
        let store = offline_store();
        store.seed([("a".to_string(), json!(1))]);
        store.seed([("b".to_string(), json!(2))]);
        assert_eq!(store.get_local("a"), Some(json!(1)));
        assert_eq!(store.get_local("b"), Some(json!(2)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_all_resolves_each_key_concurrently() {
        let server = MockServer::start_async().await;
        for key in ["one", "two"] {
            server
                .mock_async(|when, then| {
                    when.method(GET).path(format!("/customizations/gvars/{key}"));
                    then.status(200).json_body(json!({ "value": key }));
                })
                .await;
        }

        let store = store_for(&server);
        let keys = vec!["one".to_string(), "absent".to_string(), "two".to_string()];
        assert_eq!(store.ensure_all(&keys).await, vec![true, false, true]);
        assert_eq!(store.get_local("two"), Some(json!("two")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_reseeds_then_ensures_each_key() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/customizations/gvars/fetched");
                then.status(200).json_body(json!({ "value": "remote" }));
            })
            .await;

        let store = store_for(&server);
        store.seed([("stale".to_string(), json!("old"))]);
        let snapshot = store
            .refresh(
                Some(HashMap::from([("seeded".to_string(), json!("local"))])),
                &["fetched".to_string()],
            )
            .await;

        assert_eq!(snapshot.get("seeded"), Some(&json!("local")));
        assert_eq!(snapshot.get("fetched"), Some(&json!("remote")));
        assert!(!snapshot.contains_key("stale"));
    }
}
