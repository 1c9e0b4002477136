//! PostgreSQL-backed store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::DurableStore;
use crate::error::PersistenceError;
use crate::models::{AttributeMap, CompanyRecord};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableStore for PgStore {
    async fn upsert(
        &self,
        ticker: &str,
        data: &AttributeMap,
        last_updated: Option<&str>,
        retention: chrono::Duration,
    ) -> Result<(), PersistenceError> {
        let expires_at = Utc::now() + retention;
        CompanyRecord::upsert(&self.pool, ticker, data, last_updated, expires_at).await?;
        Ok(())
    }

    async fn get(&self, ticker: &str) -> Result<Option<CompanyRecord>, PersistenceError> {
        Ok(CompanyRecord::find_by_ticker(&self.pool, ticker).await?)
    }

    async fn list_all(&self) -> Result<Vec<CompanyRecord>, PersistenceError> {
        Ok(CompanyRecord::list_all(&self.pool).await?)
    }

    async fn update_category(&self, ticker: &str, category: &str) -> Result<bool, PersistenceError> {
        Ok(CompanyRecord::update_category(&self.pool, ticker, category).await?)
    }

    async fn purge_expired(&self) -> Result<u64, PersistenceError> {
        Ok(CompanyRecord::delete_expired(&self.pool).await?)
    }
}
