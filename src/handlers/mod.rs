//! API handlers for the marketplace backend

pub mod listing;
pub mod valuation;

pub use listing::*;
pub use valuation::*;

/// Service banner
pub async fn root() -> &'static str {
    "MotoSwap API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}
