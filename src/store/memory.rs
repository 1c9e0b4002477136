//! In-process store used by tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::types::Json;

use super::DurableStore;
use crate::error::PersistenceError;
use crate::models::{AttributeMap, CompanyRecord};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, CompanyRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn upsert(
        &self,
        ticker: &str,
        data: &AttributeMap,
        last_updated: Option<&str>,
        retention: chrono::Duration,
    ) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Store("store unavailable".to_string()));
        }

        let now = Utc::now();
        let mut records = self.records.write();
        records.insert(ticker.to_string(), CompanyRecord {
            ticker: ticker.to_string(),
            data: Json(data.clone()),
            last_updated: last_updated.map(str::to_string),
            category: None,
            expires_at: now + retention,
            updated_at: now,
        });
        Ok(())
    }

    async fn get(&self, ticker: &str) -> Result<Option<CompanyRecord>, PersistenceError> {
        let now = Utc::now();
        Ok(self.records.read()
            .get(ticker)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<CompanyRecord>, PersistenceError> {
        let now = Utc::now();
        Ok(self.records.read()
            .values()
            .filter(|r| !r.is_expired(now))
            .cloned()
            .collect())
    }

    async fn update_category(&self, ticker: &str, category: &str) -> Result<bool, PersistenceError> {
        match self.records.write().get_mut(ticker) {
            Some(record) => {
                record.category = Some(category.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self) -> Result<u64, PersistenceError> {
        let now = Utc::now();
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> AttributeMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let store = MemoryStore::new();
        let data = attrs(json!({"Symbol": "AAPL", "Beta": "1.2", "LatestQuarter": "2024-06-30"}));

        store.upsert("AAPL", &data, Some("2024-06-30"), chrono::Duration::days(90)).await.unwrap();
        assert!(store.update_category("AAPL", "Blue Chip").await.unwrap());

        let record = store.get("AAPL").await.unwrap().unwrap();
        assert_eq!(record.data.0, data);
        assert_eq!(record.category.as_deref(), Some("Blue Chip"));
        assert_eq!(record.last_updated.as_deref(), Some("2024-06-30"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_data_and_clears_category() {
        let store = MemoryStore::new();
        let retention = chrono::Duration::days(90);
        store.upsert("MSFT", &attrs(json!({"Beta": "0.9", "PERatio": "30"})), None, retention).await.unwrap();
        store.update_category("MSFT", "Growth Stock").await.unwrap();

        let replacement = attrs(json!({"Beta": "1.1"}));
        store.upsert("MSFT", &replacement, None, retention).await.unwrap();

        let record = store.get("MSFT").await.unwrap().unwrap();
        assert_eq!(record.data.0, replacement);
        assert!(record.category.is_none());
    }

    #[tokio::test]
    async fn test_expired_records_are_hidden_and_purged() {
        let store = MemoryStore::new();
        store.upsert("OLD", &AttributeMap::new(), None, chrono::Duration::seconds(-1)).await.unwrap();
        store.upsert("NEW", &AttributeMap::new(), None, chrono::Duration::days(1)).await.unwrap();

        assert!(store.get("OLD").await.unwrap().is_none());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_category_unknown_ticker() {
        let store = MemoryStore::new();
        assert!(!store.update_category("NOPE", "Other").await.unwrap());
    }
}
