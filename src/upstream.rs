//! Upstream fundamentals provider (Alpha Vantage `OVERVIEW`).

use std::time::Duration;

use async_trait::async_trait;

use crate::models::AttributeMap;

/// Company overview as the provider resolved it.
#[derive(Debug, Clone)]
pub struct FetchedCompany {
    /// Ticker echoed by the provider. May differ in casing from the request.
    pub ticker: String,
    pub data: AttributeMap,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("data not found for {0}")]
    NotFound(String),

    #[error("upstream rate limit reached: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid upstream payload: {0}")]
    Parse(String),

    #[error("fetch task failed: {0}")]
    Internal(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "upstream_status",
            FetchError::NotFound(_) => "not_found",
            FetchError::RateLimited(_) => "rate_limited",
            FetchError::Network(_) => "network",
            FetchError::Parse(_) => "invalid_payload",
            FetchError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Status { status, .. } => *status,
            FetchError::NotFound(_) => 404,
            FetchError::RateLimited(_) => 429,
            FetchError::Network(_) | FetchError::Parse(_) => 502,
            FetchError::Internal(_) => 500,
        }
    }
}

/// One remote lookup per ticker. Implementations hold no per-ticker state.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<FetchedCompany, FetchError>;
}

/// Alpha Vantage HTTP client
pub struct AlphaVantageClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl UpstreamFetcher for AlphaVantageClient {
    async fn fetch(&self, ticker: &str) -> Result<FetchedCompany, FetchError> {
        let response = self.http_client
            .get(&self.base_url)
            .query(&[("function", "OVERVIEW"), ("symbol", ticker), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status: status.as_u16(), body });
        }

        let payload: serde_json::Value = response.json().await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        parse_overview(ticker, payload)
    }
}

/// Interpret an `OVERVIEW` body. The provider answers 200 for unknown
/// symbols and throttling, so those cases are detected from the payload.
pub fn parse_overview(ticker: &str, payload: serde_json::Value) -> Result<FetchedCompany, FetchError> {
    let data = match payload {
        serde_json::Value::Object(map) => map,
        other => return Err(FetchError::Parse(format!("expected object, got {}", other))),
    };

    if data.is_empty() || data.contains_key("Error Message") {
        return Err(FetchError::NotFound(ticker.to_string()));
    }

    if !data.contains_key("Symbol") {
        if let Some(note) = data.get("Note").or_else(|| data.get("Information")) {
            return Err(FetchError::RateLimited(note.as_str().unwrap_or_default().to_string()));
        }
    }

    let resolved = data.get("Symbol")
        .and_then(|v| v.as_str())
        .unwrap_or(ticker)
        .to_string();

    Ok(FetchedCompany { ticker: resolved, data })
}
