//! Postgres-backed stores

use sqlx::PgPool;
use uuid::Uuid;

use super::{ListingStore, ValuationRuleStore};
use crate::error::StoreError;
use crate::listing::{Listing, ListingFilter};
use crate::valuation::{EngineBracket, ValuationRule};

/// Listing store over the `listings` table
#[derive(Clone)]
pub struct PgListingStore {
    db_pool: PgPool,
}

impl PgListingStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl ListingStore for PgListingStore {
    async fn create(&self, listing: &Listing) -> Result<Listing, StoreError> {
        let created = sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (
                id, seller_id, name, brand, model, model_year, engine_capacity, mileage,
                category, condition, listing_type, price, negotiated_price,
                user_counter_price, final_price, status, user_confirmed, purchased_by,
                payment_method, user_bank_details, user_qr_image, payment_screenshot,
                payment_message, dealer_note, delivery_address, contact_number,
                rental_plan, booking_date, rental_duration, rental_expiry, rented_by,
                is_exchange, exchange_bike_details, exchange_valuation, exchange_status,
                exchange_requested_by, version, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35, $36, $37, $38, $39
            )
            RETURNING *
            "#,
        )
        .bind(listing.id)
        .bind(listing.seller_id)
        .bind(&listing.name)
        .bind(&listing.brand)
        .bind(&listing.model)
        .bind(listing.model_year)
        .bind(listing.engine_capacity)
        .bind(listing.mileage)
        .bind(&listing.category)
        .bind(&listing.condition)
        .bind(listing.listing_type)
        .bind(listing.price)
        .bind(listing.negotiated_price)
        .bind(listing.user_counter_price)
        .bind(listing.final_price)
        .bind(listing.status)
        .bind(listing.user_confirmed)
        .bind(listing.purchased_by)
        .bind(listing.payment_method)
        .bind(&listing.user_bank_details)
        .bind(&listing.user_qr_image)
        .bind(&listing.payment_screenshot)
        .bind(&listing.payment_message)
        .bind(&listing.dealer_note)
        .bind(&listing.delivery_address)
        .bind(&listing.contact_number)
        .bind(listing.rental_plan)
        .bind(listing.booking_date)
        .bind(listing.rental_duration)
        .bind(listing.rental_expiry)
        .bind(listing.rented_by)
        .bind(listing.is_exchange)
        .bind(&listing.exchange_bike_details)
        .bind(listing.exchange_valuation)
        .bind(listing.exchange_status)
        .bind(listing.exchange_requested_by)
        .bind(listing.version)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::debug!(listing_id = %created.id, "listing inserted");
        Ok(created)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(listing)
    }

    async fn save(&self, listing: &Listing, expected_version: i64) -> Result<Listing, StoreError> {
        // Identity, seller and creation time never change after insert.
        let saved = sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings SET
                name = $3, brand = $4, model = $5, model_year = $6, engine_capacity = $7,
                mileage = $8, category = $9, condition = $10, listing_type = $11,
                price = $12, negotiated_price = $13, user_counter_price = $14,
                final_price = $15, status = $16, user_confirmed = $17, purchased_by = $18,
                payment_method = $19, user_bank_details = $20, user_qr_image = $21,
                payment_screenshot = $22, payment_message = $23, dealer_note = $24,
                delivery_address = $25, contact_number = $26, rental_plan = $27,
                booking_date = $28, rental_duration = $29, rental_expiry = $30,
                rented_by = $31, is_exchange = $32, exchange_bike_details = $33,
                exchange_valuation = $34, exchange_status = $35,
                exchange_requested_by = $36,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(listing.id)
        .bind(expected_version)
        .bind(&listing.name)
        .bind(&listing.brand)
        .bind(&listing.model)
        .bind(listing.model_year)
        .bind(listing.engine_capacity)
        .bind(listing.mileage)
        .bind(&listing.category)
        .bind(&listing.condition)
        .bind(listing.listing_type)
        .bind(listing.price)
        .bind(listing.negotiated_price)
        .bind(listing.user_counter_price)
        .bind(listing.final_price)
        .bind(listing.status)
        .bind(listing.user_confirmed)
        .bind(listing.purchased_by)
        .bind(listing.payment_method)
        .bind(&listing.user_bank_details)
        .bind(&listing.user_qr_image)
        .bind(&listing.payment_screenshot)
        .bind(&listing.payment_message)
        .bind(&listing.dealer_note)
        .bind(&listing.delivery_address)
        .bind(&listing.contact_number)
        .bind(listing.rental_plan)
        .bind(listing.booking_date)
        .bind(listing.rental_duration)
        .bind(listing.rental_expiry)
        .bind(listing.rented_by)
        .bind(listing.is_exchange)
        .bind(&listing.exchange_bike_details)
        .bind(listing.exchange_valuation)
        .bind(listing.exchange_status)
        .bind(listing.exchange_requested_by)
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(saved) = saved {
            return Ok(saved);
        }

        // Nothing matched: either the row is gone or someone else saved first.
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM listings WHERE id = $1)")
            .bind(listing.id)
            .fetch_one(&self.db_pool)
            .await?;

        if exists {
            Err(StoreError::VersionConflict {
                id: listing.id,
                expected: expected_version,
            })
        } else {
            Err(StoreError::NotFound(listing.id))
        }
    }

    async fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM listings WHERE 1=1");

        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        if let Some(listing_type) = filter.listing_type {
            query_builder.push(" AND listing_type = ");
            query_builder.push_bind(listing_type);
        }
        if let Some(seller_id) = filter.seller_id {
            query_builder.push(" AND seller_id = ");
            query_builder.push_bind(seller_id);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(filter.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(filter.offset());

        let listings = query_builder
            .build_query_as::<Listing>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(listings)
    }
}

/// Valuation rules, one row per engine bracket
#[derive(Clone)]
pub struct PgValuationRuleStore {
    db_pool: PgPool,
}

impl PgValuationRuleStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl ValuationRuleStore for PgValuationRuleStore {
    async fn find(&self, bracket: EngineBracket) -> Result<Option<ValuationRule>, StoreError> {
        let rule = sqlx::query_as::<_, ValuationRule>(
            "SELECT * FROM valuation_rules WHERE bracket = $1",
        )
        .bind(bracket)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(rule)
    }

    async fn list(&self) -> Result<Vec<ValuationRule>, StoreError> {
        let rules = sqlx::query_as::<_, ValuationRule>(
            "SELECT * FROM valuation_rules ORDER BY base_price ASC",
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rules)
    }

    async fn upsert(&self, rule: &ValuationRule) -> Result<ValuationRule, StoreError> {
        let stored = sqlx::query_as::<_, ValuationRule>(
            r#"
            INSERT INTO valuation_rules (
                bracket, base_price, condition_a, condition_b, condition_c,
                yearly_depreciation, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (bracket) DO UPDATE SET
                base_price = EXCLUDED.base_price,
                condition_a = EXCLUDED.condition_a,
                condition_b = EXCLUDED.condition_b,
                condition_c = EXCLUDED.condition_c,
                yearly_depreciation = EXCLUDED.yearly_depreciation,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(rule.bracket)
        .bind(rule.base_price)
        .bind(rule.condition_a)
        .bind(rule.condition_b)
        .bind(rule.condition_c)
        .bind(rule.yearly_depreciation)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(bracket = %stored.bracket, base_price = stored.base_price, "valuation rule updated");
        Ok(stored)
    }
}
