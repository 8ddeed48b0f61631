// src/services/cache.rs
//
// In-memory memoization of provider calls, keyed by function and arguments.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Identity of a cached call: the function name plus its rendered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    function: &'static str,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new(function: &'static str, args: impl IntoIterator<Item = impl ToString>) -> Self {
        CacheKey {
            function,
            args: args.into_iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.function, self.args.join(","))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

/// Thread-safe TTL cache. Values are stored as JSON so one store can hold
/// results of different types.
#[derive(Debug, Clone)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        CacheStore {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl == Duration::ZERO
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(&key.to_string())?;
        if Instant::now() > entry.expires_at {
            return None;
        }
        serde_json::from_str(&entry.body).ok()
    }

    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if self.is_disabled() {
            return;
        }
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(e) => {
                debug!("Not caching {}: {}", key, e);
                return;
            }
        };
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Sweep on write; nothing else evicts.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                body,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result. Errors pass through and are never cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        debug!("Cache miss for {}", key);
        let value = fetch().await?;
        self.put(&key, &value).await;
        Ok(value)
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
