//! Company handlers

use axum::{extract::{Path, State}, Json};
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::classify::ReclassifySummary;
use crate::models::{CompanyRecord, UpdateCompanyRequest, UpdateCompanyResponse};

/// Store a company payload and assign it a category
pub async fn update_company(
    State(state): State<AppState>,
    Json(req): Json<UpdateCompanyRequest>,
) -> AppResult<Json<UpdateCompanyResponse>> {
    req.validate()?;
    let ticker = req.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::ValidationError("Ticker is required".to_string()));
    }
    if ticker.contains(',') {
        return Err(AppError::ValidationError("Ticker must not contain ','".to_string()));
    }

    let last_updated = CompanyRecord::last_updated_marker(&req.data);
    state.store
        .upsert(&ticker, &req.data, last_updated.as_deref(), state.config.retention())
        .await?;

    let classification = state.classifier.classify_record(&ticker, &req.data).await?;
    if let Some(warning) = classification.warning {
        return Err(AppError::DatabaseError(warning));
    }

    tracing::info!("Company {} updated as {}", ticker, classification.category);

    Ok(Json(UpdateCompanyResponse {
        ticker,
        category: classification.category.to_string(),
        cluster: classification.cluster,
        cluster_error: classification.cluster_error,
    }))
}

/// Get stored company
pub async fn get(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> AppResult<Json<CompanyRecord>> {
    let company = state.store
        .get(&ticker.to_uppercase())
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    Ok(Json(company))
}

/// Recompute categories for every stored company
pub async fn reclassify(
    State(state): State<AppState>,
) -> AppResult<Json<ReclassifySummary>> {
    let summary = state.classifier.reclassify_all().await?;
    Ok(Json(summary))
}
