//! Company model

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use chrono::{DateTime, Utc};
use validator::Validate;

/// Raw provider fields for one company, as returned by the upstream API.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRecord {
    pub ticker: String,
    pub data: Json<AttributeMap>,
    pub last_updated: Option<String>,
    pub category: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 16))]
    pub ticker: String,
    pub data: AttributeMap,
}

#[derive(Debug, Serialize)]
pub struct UpdateCompanyResponse {
    pub ticker: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_error: Option<String>,
}

impl CompanyRecord {
    /// Provider's reporting marker (`LatestQuarter`) for an attribute map.
    pub fn last_updated_marker(data: &AttributeMap) -> Option<String> {
        data.get("LatestQuarter")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub async fn upsert(
        pool: &PgPool,
        ticker: &str,
        data: &AttributeMap,
        last_updated: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO companies (ticker, data, last_updated, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ticker) DO UPDATE SET
                data = EXCLUDED.data,
                last_updated = EXCLUDED.last_updated,
                category = NULL,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#
        )
        .bind(ticker)
        .bind(Json(data))
        .bind(last_updated)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_ticker(pool: &PgPool, ticker: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CompanyRecord>(
            "SELECT * FROM companies WHERE ticker = $1 AND expires_at > NOW()"
        )
        .bind(ticker)
        .fetch_optional(pool)
        .await
    }

    /// All live companies, ordered by ticker.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CompanyRecord>(
            "SELECT * FROM companies WHERE expires_at > NOW() ORDER BY ticker ASC"
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update_category(pool: &PgPool, ticker: &str, category: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE companies SET category = $2 WHERE ticker = $1")
            .bind(ticker)
            .bind(category)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM companies WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
