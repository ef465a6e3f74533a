//! Listing lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::listing::{
    CompletePaymentRequest, ConfirmSaleRequest, CounterOfferRequest, CreateListingRequest,
    ExchangeBikeDetails, Listing, ListingFilter, ProposalRequest, RentRequest,
    ValuateExchangeRequest,
};
use crate::listing_service::ListingService;
use crate::models::{Actor, ApiResponse};

type ListingResponse = Result<Json<ApiResponse<Listing>>, ApiError>;

/// Create a new listing
pub async fn create_listing(
    State(service): State<Arc<ListingService>>,
    actor: Actor,
    Json(request): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Listing>>), ApiError> {
    let listing = service.create_listing(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(listing))))
}

/// List listings with filters
pub async fn list_listings(
    State(service): State<Arc<ListingService>>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<ApiResponse<Vec<Listing>>>, ApiError> {
    let listings = service.list_listings(&filter).await?;
    Ok(Json(ApiResponse::ok(listings)))
}

/// Get a single listing
pub async fn get_listing(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
) -> ListingResponse {
    Ok(Json(ApiResponse::ok(service.get_listing(id).await?)))
}

pub async fn propose_or_counter(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<ProposalRequest>,
) -> ListingResponse {
    let listing = service.propose_or_counter(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn counter_offer(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<CounterOfferRequest>,
) -> ListingResponse {
    let listing = service.counter_offer(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn confirm_sale(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<ConfirmSaleRequest>,
) -> ListingResponse {
    let listing = service.confirm_sale(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn complete_payment(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<CompletePaymentRequest>,
) -> ListingResponse {
    let listing = service.complete_payment(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn rent_bike(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<RentRequest>,
) -> ListingResponse {
    let listing = service.rent_bike(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn request_exchange(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(details): Json<ExchangeBikeDetails>,
) -> ListingResponse {
    let listing = service.request_exchange(id, &actor, details).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// Admin override of a trade-in valuation
pub async fn valuate_exchange(
    State(service): State<Arc<ListingService>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<ValuateExchangeRequest>,
) -> ListingResponse {
    let listing = service.valuate_exchange(id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(listing)))
}
