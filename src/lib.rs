//! MotoSwap Backend Library
//!
//! Listing transaction engine for the vehicle marketplace: sale negotiation, rentals,
//! trade-in exchanges and the HTTP API that drives them.

pub mod app_state;
pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod listing;
pub mod listing_service;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod rental;
pub mod routes;
pub mod settlement;
pub mod store;
pub mod valuation;
