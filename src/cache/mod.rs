//! Response caching.
//!
//! The gateway consumes a cache store only through get/set by key; the
//! store's engine is pluggable. Keys are the raw request parameter bytes
//! with the token and device-id substrings removed, so cache hits are
//! shared across identities and no secret ends up in a key.
//!
//! Cache failures are never terminal for a request: a miss or an
//! unavailable store falls through to normal dispatch, and a failed write
//! is logged and swallowed. Writes happen synchronously before the request
//! task finishes.

use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;

/// Error type for cache store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Contract the gateway holds against the backing store.
pub trait CacheStore: Send + Sync {
    fn get(&self, pattern: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError>;
    fn set(&self, pattern: &str, key: &[u8], value: &[u8]) -> Result<(), CacheError>;
}

/// In-memory store backed by a concurrent map. Entries are grouped by
/// route pattern, mirroring a hash-per-pattern layout in an external store.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<(String, Vec<u8>), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries across all patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, pattern: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .entries
            .get(&(pattern.to_string(), key.to_vec()))
            .map(|entry| entry.value().clone()))
    }

    fn set(&self, pattern: &str, key: &[u8], value: &[u8]) -> Result<(), CacheError> {
        self.entries
            .insert((pattern.to_string(), key.to_vec()), value.to_vec());
        Ok(())
    }
}

/// Remove every occurrence of `needle` from `haystack`.
fn remove_all(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

/// Derive a cache key from raw request parameters by stripping the token
/// and device-id substrings. Identity-independent: two requests differing
/// only in those fields sanitize to the same key.
pub fn sanitize_key(params: &[u8], token: &str, device_id: &str) -> Vec<u8> {
    let stripped = remove_all(params, token.as_bytes());
    remove_all(&stripped, device_id.as_bytes())
}

/// Cache adapter used by the request pipeline. Applies key sanitization
/// and downgrades every store failure to a log line.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Look up a previously cached payload. Returns `None` on miss and on
    /// store failure; the pipeline treats both as fall-through.
    pub fn lookup(&self, pattern: &str, params: &[u8], token: &str, device_id: &str) -> Option<Vec<u8>> {
        let key = sanitize_key(params, token, device_id);
        match self.store.get(pattern, &key) {
            Ok(Some(payload)) => {
                tracing::debug!(pattern, "cache hit");
                metrics::record_cache_event("hit");
                Some(payload)
            }
            Ok(None) => {
                metrics::record_cache_event("miss");
                None
            }
            Err(err) => {
                tracing::warn!(pattern, error = %err, "cache lookup failed");
                metrics::record_cache_event("unavailable");
                None
            }
        }
    }

    /// Store a successful response payload. Best effort: failures are
    /// logged and never fail the request that produced the payload.
    pub fn store(&self, pattern: &str, params: &[u8], token: &str, device_id: &str, payload: &[u8]) {
        let key = sanitize_key(params, token, device_id);
        if let Err(err) = self.store.set(pattern, &key, payload) {
            tracing::warn!(pattern, error = %err, "cache write failed");
            metrics::record_cache_event("store_failed");
        }
    }
}
