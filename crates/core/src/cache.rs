//! In-memory query result cache
//!
//! Results are stored as JSON values under a composite [`QueryKey`] with a
//! freshness window. Invalidation works on key prefixes, so invalidating
//! `["cart"]` drops `["cart"]` and `["cart", "summary"]` alike.
//!
//! # Example
//!
//! ```rust
//! use storefront_core::cache::{QueryCache, QueryKey};
//! use std::time::Duration;
//!
//! let cache = QueryCache::new(Duration::from_secs(60));
//! let key = QueryKey::from(["products", "1"]);
//! cache.set(&key, &vec![1, 2, 3], None);
//!
//! let hit: Option<Vec<u32>> = cache.get(&key);
//! assert_eq!(hit, Some(vec![1, 2, 3]));
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::warn;

/// Composite identifier for a cached query, e.g. `["products", "2"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Build a key from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append a segment
    #[must_use]
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Segments of the key
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` matches the leading segments of this key
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<&str> for QueryKey {
    fn from(segment: &str) -> Self {
        Self::new([segment])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// All stored entries
    pub total_entries: usize,
    /// Entries past their freshness window
    pub stale_entries: usize,
}

/// Query result cache keyed by [`QueryKey`]
#[derive(Debug)]
pub struct QueryCache {
    default_ttl: Duration,
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl QueryCache {
    /// Create a cache whose entries stay fresh for `default_ttl`
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh raw value for `key`
    pub fn get_value(&self, key: &QueryKey) -> Option<Value> {
        let guard = self.entries.read().ok()?;
        guard
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.value.clone())
    }

    /// Fresh value for `key`, decoded into `T`
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value no longer decodes, dropping");
                self.remove(key);
                None
            }
        }
    }

    /// Store a raw value; `ttl` overrides the default freshness window
    pub fn set_value(&self, key: &QueryKey, value: Value, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl.unwrap_or(self.default_ttl),
        };
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key.clone(), entry);
        }
    }

    /// Store a serializable value
    pub fn set<T: Serialize>(&self, key: &QueryKey, value: &T, ttl: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, value, ttl),
            Err(e) => warn!(key = %key, error = %e, "Value could not be cached"),
        }
    }

    /// Remove one exact key
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.entries
            .write()
            .map(|mut guard| guard.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Remove every key starting with `prefix`; returns how many were dropped
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let Ok(mut guard) = self.entries.write() else {
            return 0;
        };
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        before - guard.len()
    }

    /// Remove everything
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }

    /// Drop stale entries; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let Ok(mut guard) = self.entries.write() else {
            return 0;
        };
        let before = guard.len();
        guard.retain(|_, entry| entry.is_fresh());
        before - guard.len()
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.entries
            .read()
            .map(|guard| CacheStats {
                total_entries: guard.len(),
                stale_entries: guard.values().filter(|e| !e.is_fresh()).count(),
            })
            .unwrap_or(CacheStats {
                total_entries: 0,
                stale_entries: 0,
            })
    }
}
