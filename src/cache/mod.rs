//! Volatile cache
//!
//! Short-lived copy of provider payloads. Not authoritative: a miss or a
//! read failure only means the ticker has to be fetched again.

mod redis_backend;
#[cfg(test)]
pub mod memory;

pub use redis_backend::RedisCache;

use async_trait::async_trait;

use crate::error::PersistenceError;

/// Cache key for a normalized ticker.
pub fn cache_key(ticker: &str) -> String {
    format!("ticker:{}", ticker)
}

#[async_trait]
pub trait VolatileCache: Send + Sync {
    /// Serialized value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key` for `ttl_seconds`, replacing any previous entry.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), PersistenceError>;
}
