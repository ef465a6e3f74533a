//! Persistence for listings and valuation rules
//!
//! The service talks to storage only through the traits below. `postgres` backs the
//! deployed server; `memory` is used when no database is configured and in tests.

use uuid::Uuid;

use crate::error::StoreError;
use crate::listing::{Listing, ListingFilter};
use crate::valuation::{EngineBracket, ValuationRule};

mod memory;
mod postgres;

pub use memory::{MemoryListingStore, MemoryValuationRuleStore};
pub use postgres::{PgListingStore, PgValuationRuleStore};

#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert a new listing. Returns the stored row.
    async fn create(&self, listing: &Listing) -> Result<Listing, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;

    /// Replace a listing if its stored version still equals `expected_version`.
    ///
    /// On success the returned listing carries the bumped version and a fresh
    /// `updated_at`. A stale version yields [`StoreError::VersionConflict`].
    async fn save(&self, listing: &Listing, expected_version: i64) -> Result<Listing, StoreError>;

    /// Newest first, paged by the filter.
    async fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError>;
}

#[async_trait::async_trait]
pub trait ValuationRuleStore: Send + Sync {
    async fn find(&self, bracket: EngineBracket) -> Result<Option<ValuationRule>, StoreError>;

    async fn list(&self) -> Result<Vec<ValuationRule>, StoreError>;

    /// Insert or replace the rule for its bracket.
    async fn upsert(&self, rule: &ValuationRule) -> Result<ValuationRule, StoreError>;
}
