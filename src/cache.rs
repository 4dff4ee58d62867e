//! Process-scoped in-memory cache.
//!
//! A bounded LRU of JSON values behind a mutex. Entries are lost on restart;
//! durable storage is the deployment's job.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Shared key/value store, registered as the persistent `cache` dependency.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryCache {
    /// A cache holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!(key = %key, "Cache set");
        self.lock().put(key, value);
    }

    /// Remove `key`, returning the previous value.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.lock().pop(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}
