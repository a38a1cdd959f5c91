//! Generation-scoped cache store for captured HTTP responses.
//!
//! A generation is a named namespace of cache entries; exactly one is
//! current at any time. Entries are keyed by request identity (method plus
//! the exact URL) and are immutable once written: a `put` for the same key
//! replaces the prior entry in one step.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use snackkit_net::{Request, Response};

/// Request identity: method plus the exact absolute URL. Query strings are
/// significant and never normalized, so two requests differing only by
/// query string are distinct keys.
pub fn request_key(method: &str, url: &str) -> String {
    format!("{method} {url}")
}

/// A captured request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL as observed by the interceptor.
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,
}

impl CacheEntry {
    /// Capture a network response under the identity of the request that
    /// produced it.
    pub fn capture(request: &Request, response: &Response) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            url: request.url.to_string(),
            method: request.method.as_str().to_string(),
            status: response.status.as_u16(),
            headers,
            body: response.body.to_vec(),
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> String {
        request_key(&self.method, &self.url)
    }
}

/// One cache generation.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    name: String,
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Create an empty generation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Generation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match a request by exact identity.
    pub fn match_request(&self, method: &str, url: &str) -> Option<&CacheEntry> {
        self.entries.get(&request_key(method, url))
    }

    /// Store an entry, replacing any prior entry with the same identity.
    pub fn put(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key(), entry);
    }

    /// Delete an entry.
    pub fn delete(&mut self, method: &str, url: &str) -> bool {
        self.entries.remove(&request_key(method, url)).is_some()
    }

    /// All stored keys.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All cache generations, by name.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a generation, creating it if absent.
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Commit a fully built generation in one step, replacing any prior
    /// generation of the same name. Install stages its cache outside the
    /// storage and commits it here, so a partially populated generation is
    /// never observable.
    pub fn insert(&mut self, cache: Cache) {
        self.caches.insert(cache.name().to_string(), cache);
    }

    /// Check if a generation exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Get a generation by name.
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Delete a generation and everything in it.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Names of all generations.
    pub fn generations(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Match a request within one generation.
    pub fn match_in(&self, generation: &str, method: &str, url: &str) -> Option<&CacheEntry> {
        self.caches
            .get(generation)
            .and_then(|cache| cache.match_request(method, url))
    }
}
