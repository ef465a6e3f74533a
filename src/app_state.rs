//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::listing_service::ListingService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub listing_service: Arc<ListingService>,
}

impl AppState {
    pub fn new(listing_service: Arc<ListingService>) -> Self {
        Self { listing_service }
    }
}

impl FromRef<AppState> for Arc<ListingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.listing_service.clone()
    }
}
