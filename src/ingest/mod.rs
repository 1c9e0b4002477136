//! Ingestion Pipeline - cache, fetch, write-through, classify
//!
//! Resolves a batch of tickers against the volatile cache, fetches the
//! misses concurrently, writes every success to both the cache and the
//! durable store, classifies it, and answers with one outcome per ticker.
//!
//! # Failure Strategy
//! - Bad batch shape -> `ValidationError` before any side effect
//! - Upstream failure -> error outcome for that ticker only
//! - Cache/store write failure -> logged, reported as a warning
//! - Classification failure -> reported in the outcome, data still returned


use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::cache::{cache_key, VolatileCache};
use crate::classify::ClassificationService;
use crate::models::{AttributeMap, BatchResponse, CompanyRecord, ErrorDescriptor, TickerOutcome};
use crate::store::DurableStore;
use crate::upstream::{FetchError, UpstreamFetcher};
use crate::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub cache_ttl_seconds: u64,
    pub retention: chrono::Duration,
    pub max_batch_size: usize,
}

/// Orchestrates one batch request. Cheap to clone; every dependency is shared.
#[derive(Clone)]
pub struct IngestService {
    cache: Arc<dyn VolatileCache>,
    store: Arc<dyn DurableStore>,
    fetcher: Arc<dyn UpstreamFetcher>,
    classifier: Arc<ClassificationService>,
    settings: IngestSettings,
}

/// Split a comma-separated ticker list into normalized, unique tickers.
pub fn parse_tickers(raw: &str, max_batch_size: usize) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let tickers: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if tickers.is_empty() {
        return Err(AppError::ValidationError("At least one ticker is required".to_string()));
    }
    if tickers.len() > max_batch_size {
        return Err(AppError::ValidationError(format!("Maximum {} tickers allowed", max_batch_size)));
    }

    Ok(tickers)
}

impl IngestService {
    pub fn new(
        cache: Arc<dyn VolatileCache>,
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn UpstreamFetcher>,
        classifier: Arc<ClassificationService>,
        settings: IngestSettings,
    ) -> Self {
        Self { cache, store, fetcher, classifier, settings }
    }

    /// Resolve a raw comma-separated ticker list.
    pub async fn fetch_batch(&self, raw: &str) -> AppResult<BatchResponse> {
        let tickers = parse_tickers(raw, self.settings.max_batch_size)?;
        Ok(self.resolve(tickers).await)
    }

    /// Resolve already-normalized tickers. Every ticker gets an outcome.
    pub async fn resolve(&self, tickers: Vec<String>) -> BatchResponse {
        let lookups = join_all(tickers.iter().map(|t| self.lookup_cache(t))).await;

        let mut response = BatchResponse::new();
        let mut misses = Vec::new();
        for (ticker, cached) in tickers.into_iter().zip(lookups) {
            match cached {
                Some(data) => {
                    response.insert(ticker, TickerOutcome::Cached { data });
                }
                None => misses.push(ticker),
            }
        }

        // Spawned rather than awaited in place: if the caller goes away,
        // each ticker's writes still finish.
        let handles: Vec<_> = misses
            .iter()
            .map(|ticker| {
                let this = self.clone();
                let ticker = ticker.clone();
                tokio::spawn(async move { this.ingest(&ticker).await })
            })
            .collect();

        let results = join_all(handles).await;
        for (ticker, result) in misses.into_iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| {
                tracing::error!("Fetch task for {} failed: {}", ticker, e);
                TickerOutcome::Error {
                    error: ErrorDescriptor::from(&FetchError::Internal(e.to_string())),
                }
            });
            response.insert(ticker, outcome);
        }

        let failed = response.values().filter(|o| o.is_error()).count();
        tracing::info!("Resolved {} tickers ({} failed)", response.len(), failed);

        response
    }

    /// Cached attribute map, if any. Read failures count as misses.
    async fn lookup_cache(&self, ticker: &str) -> Option<AttributeMap> {
        match self.cache.get(&cache_key(ticker)).await {
            Ok(Some(raw)) => match serde_json::from_str::<AttributeMap>(&raw) {
                Ok(data) => {
                    tracing::debug!("Cache hit for {}", ticker);
                    Some(data)
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry for {}: {}", ticker, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache lookup failed for {}: {}", ticker, e);
                None
            }
        }
    }

    /// Fetch one ticker, write it through and classify it.
    async fn ingest(&self, ticker: &str) -> TickerOutcome {
        let fetched = match self.fetcher.fetch(ticker).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", ticker, e);
                return TickerOutcome::Error { error: ErrorDescriptor::from(&e) };
            }
        };

        if fetched.ticker != ticker {
            tracing::debug!("Upstream resolved {} as {}", ticker, fetched.ticker);
        }
        let data = fetched.data;

        let mut warnings = self.write_through(ticker, &data).await;

        let (category, cluster, cluster_error, classification_error) =
            match self.classifier.classify_record(ticker, &data).await {
                Ok(c) => {
                    warnings.extend(c.warning);
                    (Some(c.category.to_string()), c.cluster, c.cluster_error, None)
                }
                Err(e) => {
                    tracing::warn!("Classification failed for {}: {}", ticker, e);
                    (None, None, None, Some(e.to_string()))
                }
            };

        tracing::info!("Ingested {} (category {:?})", ticker, category);

        TickerOutcome::Fetched { data, category, cluster, cluster_error, classification_error, warnings }
    }

    /// Write to cache and store independently; neither failure stops the other.
    async fn write_through(&self, ticker: &str, data: &AttributeMap) -> Vec<String> {
        let key = cache_key(ticker);
        let last_updated = CompanyRecord::last_updated_marker(data);

        let cache_write = async {
            let encoded = serde_json::to_string(data)?;
            self.cache.set(&key, &encoded, self.settings.cache_ttl_seconds).await
        };
        let store_write = self.store.upsert(ticker, data, last_updated.as_deref(), self.settings.retention);

        let (cache_result, store_result) = tokio::join!(cache_write, store_write);

        let mut warnings = Vec::new();
        for result in [cache_result, store_result] {
            if let Err(e) = result {
                tracing::warn!("Write-through failed for {}: {}", ticker, e);
                warnings.push(e.to_string());
            }
        }
        warnings
    }
}
