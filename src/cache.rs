//! TTL-keyed in-memory result cache.
//!
//! Entries expire lazily: a read past `expires_at` drops the entry and
//! reports a miss. Nothing sweeps the map in the background.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// A cached payload with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Stored entries, including expired ones not yet read.
    pub size: usize,
    /// Stored keys, sorted.
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
}

/// Single-process TTL cache.
pub struct CacheManager<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone + Send + Sync> CacheManager<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the value for `key` if it has not expired.
    pub async fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.payload.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check: a writer may have refreshed the entry in between.
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(Instant::now()) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.payload.clone());
            }
        }
        entries.remove(key);
        debug!("Cache entry '{}' expired", key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `value` under `key` for `ttl`.
    pub async fn set(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let entry = CacheEntry {
            payload: value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Removes `key`. Returns whether an entry was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Returns size, keys and hit/miss counters.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: entries.len(),
            keys,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone + Send + Sync> Default for CacheManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
