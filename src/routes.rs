//! Route definitions for the marketplace API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Listing routes
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/api/listings", post(create_listing).get(list_listings))
        .route("/api/listings/:id", get(get_listing))
        .route("/api/listings/:id/proposal", post(propose_or_counter))
        .route("/api/listings/:id/counter-offer", post(counter_offer))
        .route("/api/listings/:id/confirm", post(confirm_sale))
        .route("/api/listings/:id/payment", post(complete_payment))
        .route("/api/listings/:id/rent", post(rent_bike))
        .route("/api/listings/:id/exchange", post(request_exchange))
        .route("/api/listings/:id/exchange/valuation", post(valuate_exchange))
}

// Valuation routes
pub fn valuation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/valuation-rules", get(list_valuation_rules))
        .route("/api/valuation-rules/:bracket", put(upsert_valuation_rule))
        .route("/api/valuation/estimate", post(estimate_valuation))
}

/// Full application router, without transport layers
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(listing_routes())
        .merge(valuation_routes())
        .with_state(state)
}
