//! Valuation rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiError;
use crate::listing_service::ListingService;
use crate::models::{Actor, ApiResponse};
use crate::valuation::{
    EngineBracket, EstimateValuationRequest, UpsertValuationRuleRequest, ValuationEstimate,
    ValuationRule,
};

pub async fn list_valuation_rules(
    State(service): State<Arc<ListingService>>,
) -> Result<Json<ApiResponse<Vec<ValuationRule>>>, ApiError> {
    Ok(Json(ApiResponse::ok(service.list_valuation_rules().await?)))
}

pub async fn upsert_valuation_rule(
    State(service): State<Arc<ListingService>>,
    Path(bracket): Path<String>,
    actor: Actor,
    Json(request): Json<UpsertValuationRuleRequest>,
) -> Result<Json<ApiResponse<ValuationRule>>, ApiError> {
    let bracket: EngineBracket = bracket.parse().map_err(ApiError::BadRequest)?;
    let rule = service.upsert_valuation_rule(&actor, bracket, request).await?;
    Ok(Json(ApiResponse::ok(rule)))
}

/// Quote a trade-in before making an offer
pub async fn estimate_valuation(
    State(service): State<Arc<ListingService>>,
    Json(request): Json<EstimateValuationRequest>,
) -> Result<Json<ApiResponse<ValuationEstimate>>, ApiError> {
    Ok(Json(ApiResponse::ok(service.estimate_valuation(request).await?)))
}
