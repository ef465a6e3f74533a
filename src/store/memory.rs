//! In-process stores

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ListingStore, ValuationRuleStore};
use crate::error::StoreError;
use crate::listing::{Listing, ListingFilter};
use crate::valuation::{EngineBracket, ValuationRule};

#[derive(Default)]
pub struct MemoryListingStore {
    listings: RwLock<HashMap<Uuid, Listing>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ListingStore for MemoryListingStore {
    async fn create(&self, listing: &Listing) -> Result<Listing, StoreError> {
        let mut listings = self.listings.write().await;
        listings.insert(listing.id, listing.clone());
        Ok(listing.clone())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn save(&self, listing: &Listing, expected_version: i64) -> Result<Listing, StoreError> {
        let mut listings = self.listings.write().await;
        let stored = listings
            .get_mut(&listing.id)
            .ok_or(StoreError::NotFound(listing.id))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: listing.id,
                expected: expected_version,
            });
        }

        let mut saved = listing.clone();
        saved.seller_id = stored.seller_id;
        saved.created_at = stored.created_at;
        saved.version = expected_version + 1;
        saved.updated_at = Utc::now();
        *stored = saved.clone();

        Ok(saved)
    }

    async fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().await;
        let mut matching: Vec<Listing> = listings
            .values()
            .filter(|listing| filter.matches(listing))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit()).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

#[derive(Default)]
pub struct MemoryValuationRuleStore {
    rules: RwLock<HashMap<EngineBracket, ValuationRule>>,
}

impl MemoryValuationRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `rules`
    pub fn with_rules(rules: impl IntoIterator<Item = ValuationRule>) -> Self {
        let rules = rules.into_iter().map(|rule| (rule.bracket, rule)).collect();
        Self {
            rules: RwLock::new(rules),
        }
    }
}

#[async_trait::async_trait]
impl ValuationRuleStore for MemoryValuationRuleStore {
    async fn find(&self, bracket: EngineBracket) -> Result<Option<ValuationRule>, StoreError> {
        Ok(self.rules.read().await.get(&bracket).cloned())
    }

    async fn list(&self) -> Result<Vec<ValuationRule>, StoreError> {
        let rules = self.rules.read().await;
        Ok(EngineBracket::ALL
            .iter()
            .filter_map(|bracket| rules.get(bracket).cloned())
            .collect())
    }

    async fn upsert(&self, rule: &ValuationRule) -> Result<ValuationRule, StoreError> {
        let mut stored = rule.clone();
        stored.updated_at = Utc::now();
        self.rules.write().await.insert(stored.bracket, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{CreateListingRequest, ListingStateMachine, ListingStatus, ListingType};
    use crate::models::{Actor, UserRole};

    fn new_listing(seller: Uuid, listing_type: ListingType) -> Listing {
        let request = CreateListingRequest {
            name: "Weekend tourer".to_string(),
            brand: "Royal Enfield".to_string(),
            model: "Himalayan".to_string(),
            model_year: 2021,
            engine_capacity: 411.0,
            mileage: 9_500,
            category: "Adventure".to_string(),
            condition: "Excellent".to_string(),
            listing_type,
            price: 180_000,
        };
        ListingStateMachine::default()
            .create_listing(&Actor::new(seller, UserRole::Dealer), request)
            .unwrap()
            .listing
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = MemoryListingStore::new();
        let listing = store.create(&new_listing(Uuid::new_v4(), ListingType::Sale)).await.unwrap();

        let mut changed = listing.clone();
        changed.status = ListingStatus::Approved;
        let saved = store.save(&changed, listing.version).await.unwrap();

        assert_eq!(saved.version, listing.version + 1);
        assert_eq!(saved.status, ListingStatus::Approved);
        assert_eq!(store.find(listing.id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let store = MemoryListingStore::new();
        let listing = store.create(&new_listing(Uuid::new_v4(), ListingType::Sale)).await.unwrap();

        store.save(&listing, listing.version).await.unwrap();
        let result = store.save(&listing, listing.version).await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_save_unknown_listing() {
        let store = MemoryListingStore::new();
        let listing = new_listing(Uuid::new_v4(), ListingType::Sale);
        let result = store.save(&listing, 0).await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == listing.id));
    }

    #[tokio::test]
    async fn test_query_filters_and_pages() {
        let store = MemoryListingStore::new();
        let seller = Uuid::new_v4();
        for _ in 0..3 {
            store.create(&new_listing(seller, ListingType::Rental)).await.unwrap();
        }
        store.create(&new_listing(seller, ListingType::Sale)).await.unwrap();
        store.create(&new_listing(Uuid::new_v4(), ListingType::Rental)).await.unwrap();

        let filter = ListingFilter {
            listing_type: Some(ListingType::Rental),
            seller_id: Some(seller),
            ..Default::default()
        };
        assert_eq!(store.query(&filter).await.unwrap().len(), 3);

        let paged = ListingFilter {
            page: Some(2),
            limit: Some(2),
            ..filter
        };
        assert_eq!(store.query(&paged).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rule_upsert_replaces_bracket() {
        let store = MemoryValuationRuleStore::new();
        let rule = ValuationRule {
            bracket: EngineBracket::Below125,
            base_price: 50_000,
            condition_a: 5.0,
            condition_b: 10.0,
            condition_c: 20.0,
            yearly_depreciation: 7.0,
            updated_at: Utc::now(),
        };
        store.upsert(&rule).await.unwrap();
        store
            .upsert(&ValuationRule {
                base_price: 55_000,
                ..rule.clone()
            })
            .await
            .unwrap();

        let rules = store.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].base_price, 55_000);
        assert!(store.find(EngineBracket::Above400).await.unwrap().is_none());
    }
}
