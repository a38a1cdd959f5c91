//! Fetch interception.
//!
//! Every request from a controlled page resolves through exactly one of two
//! strategies, selected by a single predicate on the URL path:
//!
//! - **Network-first** for the API namespace: check-in and stats data must
//!   never be served stale while the network is up. The live response is
//!   returned verbatim and never written to the cache; only when the
//!   transport fails does the interceptor fall back to a cached entry.
//! - **Cache-first** for everything else: static assets pinned at install
//!   time are served without touching the network. A miss goes to the
//!   network and is returned without write-back; population is install's
//!   job, and an interceptor that cached arbitrary URLs would grow without
//!   bound.

use hashbrown::HashMap;
use snackkit_common::WorkerConfig;
use snackkit_net::{Fetch, Request, Response};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheStorage};
use crate::ServiceWorkerError;

/// Response handed back to the intercepted page.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Whether this response came from the cache store.
    pub from_cache: bool,
}

impl InterceptedResponse {
    /// Wrap a live network response.
    pub fn from_network(request: &Request, response: &Response) -> Self {
        let entry = CacheEntry::capture(request, response);
        Self {
            url: entry.url,
            status: entry.status,
            headers: entry.headers,
            body: entry.body,
            from_cache: false,
        }
    }

    /// Replay a cached entry.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            url: entry.url.clone(),
            status: entry.status,
            headers: entry.headers.clone(),
            body: entry.body.clone(),
            from_cache: true,
        }
    }

    /// Whether the status is 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Strategy predicate: does the request target the API namespace?
pub fn is_api_request(config: &WorkerConfig, url: &Url) -> bool {
    url.path().starts_with(&config.api_prefix)
}

/// Resolve an intercepted request via the strategy its URL selects.
pub async fn handle_fetch(
    config: &WorkerConfig,
    fetcher: &dyn Fetch,
    storage: &RwLock<CacheStorage>,
    request: Request,
) -> Result<InterceptedResponse, ServiceWorkerError> {
    if is_api_request(config, &request.url) {
        network_first(config, fetcher, storage, request).await
    } else {
        cache_first(config, fetcher, storage, request).await
    }
}

async fn network_first(
    config: &WorkerConfig,
    fetcher: &dyn Fetch,
    storage: &RwLock<CacheStorage>,
    request: Request,
) -> Result<InterceptedResponse, ServiceWorkerError> {
    let method = request.method.as_str().to_string();
    let url = request.url.to_string();

    match fetcher.fetch(request.clone()).await {
        Ok(response) => {
            trace!(%url, status = %response.status, "network-first: live response");
            Ok(InterceptedResponse::from_network(&request, &response))
        }
        Err(err) => {
            let storage = storage.read().await;
            match storage.match_in(&config.cache_name, &method, &url) {
                Some(entry) => {
                    debug!(%url, error = %err, "network-first: offline, serving cached response");
                    Ok(InterceptedResponse::from_entry(entry))
                }
                None => {
                    warn!(%url, error = %err, "network-first: offline with no cached fallback");
                    Err(err.into())
                }
            }
        }
    }
}

async fn cache_first(
    config: &WorkerConfig,
    fetcher: &dyn Fetch,
    storage: &RwLock<CacheStorage>,
    request: Request,
) -> Result<InterceptedResponse, ServiceWorkerError> {
    let method = request.method.as_str().to_string();
    let url = request.url.to_string();

    {
        let storage = storage.read().await;
        if let Some(entry) = storage.match_in(&config.cache_name, &method, &url) {
            trace!(%url, "cache-first: hit");
            return Ok(InterceptedResponse::from_entry(entry));
        }
    }

    trace!(%url, "cache-first: miss, going to network");
    let response = fetcher.fetch(request.clone()).await?;
    Ok(InterceptedResponse::from_network(&request, &response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::testutil::ScriptedFetch;

    fn config() -> WorkerConfig {
        WorkerConfig::default()
    }

    fn request_for(config: &WorkerConfig, path: &str) -> Request {
        Request::get(config.resolve(path).unwrap())
    }

    fn cached_storage(config: &WorkerConfig, method: &str, path: &str, body: &[u8]) -> RwLock<CacheStorage> {
        let url = config.resolve(path).unwrap();
        let mut cache = Cache::new(&config.cache_name);
        cache.put(CacheEntry {
            url: url.to_string(),
            method: method.to_string(),
            status: 200,
            headers: HashMap::new(),
            body: body.to_vec(),
        });
        let mut storage = CacheStorage::new();
        storage.insert(cache);
        RwLock::new(storage)
    }

    #[test]
    fn test_api_predicate() {
        let config = config();
        assert!(is_api_request(&config, &config.resolve("/api/stats").unwrap()));
        assert!(is_api_request(&config, &config.resolve("/api/checkin").unwrap()));
        assert!(!is_api_request(&config, &config.resolve("/").unwrap()));
        assert!(!is_api_request(&config, &config.resolve("/static/app.js").unwrap()));
    }

    #[tokio::test]
    async fn test_api_live_network_wins_over_stale_cache() {
        let config = config();
        let fetcher = ScriptedFetch::new().route("GET", "/api/stats", 200, b"{\"streak\":9}");
        let storage = cached_storage(&config, "GET", "/api/stats", b"{\"streak\":1}");

        let response = handle_fetch(&config, &fetcher, &storage, request_for(&config, "/api/stats"))
            .await
            .unwrap();

        assert!(!response.from_cache);
        assert_eq!(response.body, b"{\"streak\":9}");
    }

    #[tokio::test]
    async fn test_api_response_is_not_written_to_cache() {
        let config = config();
        let fetcher = ScriptedFetch::new().route("GET", "/api/stats", 200, b"{}");
        let storage = RwLock::new(CacheStorage::new());

        handle_fetch(&config, &fetcher, &storage, request_for(&config, "/api/stats"))
            .await
            .unwrap();

        let url = config.resolve("/api/stats").unwrap();
        assert!(storage
            .read()
            .await
            .match_in(&config.cache_name, "GET", url.as_str())
            .is_none());
    }

    #[tokio::test]
    async fn test_api_offline_falls_back_to_cache() {
        let config = config();
        let fetcher = ScriptedFetch::offline();
        let storage = cached_storage(&config, "GET", "/api/stats", b"{\"streak\":1}");

        let response = handle_fetch(&config, &fetcher, &storage, request_for(&config, "/api/stats"))
            .await
            .unwrap();

        assert!(response.from_cache);
        assert_eq!(response.body, b"{\"streak\":1}");
    }

    #[tokio::test]
    async fn test_api_offline_without_cache_propagates_failure() {
        let config = config();
        let fetcher = ScriptedFetch::offline();
        let storage = RwLock::new(CacheStorage::new());

        let result =
            handle_fetch(&config, &fetcher, &storage, request_for(&config, "/api/stats")).await;

        assert!(matches!(result, Err(ServiceWorkerError::Network(_))));
    }

    #[tokio::test]
    async fn test_static_cache_hit_never_touches_network() {
        let config = config();
        let fetcher = ScriptedFetch::new().route("GET", "/static/app.js", 200, b"network copy");
        let storage = cached_storage(&config, "GET", "/static/app.js", b"cached copy");

        let response = handle_fetch(
            &config,
            &fetcher,
            &storage,
            request_for(&config, "/static/app.js"),
        )
        .await
        .unwrap();

        assert!(response.from_cache);
        assert_eq!(response.body, b"cached copy");
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_static_miss_fetches_without_write_back() {
        let config = config();
        let fetcher = ScriptedFetch::new().route("GET", "/static/new.css", 200, b"fresh");
        let storage = RwLock::new(CacheStorage::new());

        let response = handle_fetch(
            &config,
            &fetcher,
            &storage,
            request_for(&config, "/static/new.css"),
        )
        .await
        .unwrap();

        assert!(!response.from_cache);
        assert_eq!(response.body, b"fresh");

        // Manifest drift is not healed: the fetched asset is not cached.
        let url = config.resolve("/static/new.css").unwrap();
        assert!(storage
            .read()
            .await
            .match_in(&config.cache_name, "GET", url.as_str())
            .is_none());
    }

    #[tokio::test]
    async fn test_query_string_variants_are_distinct() {
        let config = config();
        let fetcher = ScriptedFetch::offline();
        let storage = cached_storage(&config, "GET", "/static/app.js", b"plain");

        // Same path with a query string is a different identity: cache miss,
        // and with the network down the fetch fails.
        let result = handle_fetch(
            &config,
            &fetcher,
            &storage,
            request_for(&config, "/static/app.js?v=2"),
        )
        .await;

        assert!(result.is_err());
    }
}
