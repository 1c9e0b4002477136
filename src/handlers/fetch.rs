//! Batch fetch handler

use axum::{extract::{Query, State}, Json};
use serde::Deserialize;

use crate::{AppState, AppResult};
use crate::models::BatchResponse;

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    /// Tickers separated by commas, e.g. `AAPL,MSFT,GOOGL`
    pub symbol: String,
}

/// Resolve up to `max_batch_size` tickers from cache or upstream
pub async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> AppResult<Json<BatchResponse>> {
    let response = state.ingest.fetch_batch(&query.symbol).await?;
    Ok(Json(response))
}
