//! In-process cache used by tests

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::VolatileCache;
use crate::error::PersistenceError;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry that expires after `ttl`.
    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.write().insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    /// Raw lookup that ignores expiry.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).map(|(v, _)| v.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[async_trait]
impl VolatileCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.read();
        Ok(entries.get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), PersistenceError> {
        self.insert(key, value, Duration::from_secs(ttl_seconds));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_key;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set(&cache_key("AAPL"), "{}", 60).await.unwrap();
        assert_eq!(cache.get("ticker:AAPL").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(cache.get("ticker:MSFT").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.insert("ticker:AAPL", "{}", Duration::ZERO);
        assert_eq!(cache.get("ticker:AAPL").await.unwrap(), None);
        assert!(cache.peek("ticker:AAPL").is_some());
    }
}
