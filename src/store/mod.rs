//! Durable company store
//!
//! Authoritative copy of every fetched company. Records expire after the
//! retention window counted from their last write.

mod postgres;
#[cfg(test)]
pub mod memory;

pub use postgres::PgStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::{AttributeMap, CompanyRecord};

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Insert or fully replace the attribute map for `ticker`.
    /// Clears the stored category; it belonged to the replaced data.
    async fn upsert(
        &self,
        ticker: &str,
        data: &AttributeMap,
        last_updated: Option<&str>,
        retention: chrono::Duration,
    ) -> Result<(), PersistenceError>;

    async fn get(&self, ticker: &str) -> Result<Option<CompanyRecord>, PersistenceError>;

    /// Every live record, ordered by ticker.
    async fn list_all(&self) -> Result<Vec<CompanyRecord>, PersistenceError>;

    /// Returns false when no record exists for `ticker`.
    async fn update_category(&self, ticker: &str, category: &str) -> Result<bool, PersistenceError>;

    /// Remove records past their retention window.
    async fn purge_expired(&self) -> Result<u64, PersistenceError>;
}

/// Background job that enforces the retention window.
pub fn spawn_retention_sweeper(
    store: Arc<dyn DurableStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired companies", n),
                Err(e) => tracing::warn!("Retention sweep failed: {}", e),
            }
        }
    })
}
