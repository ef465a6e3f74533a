//! Listing service layer - Runs listing commands against storage

use std::sync::Arc;

use chrono::{Datelike, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{StoreError, TransactionError};
use crate::listing::{
    CompletePaymentRequest, ConfirmSaleRequest, CounterOfferRequest, CreateListingRequest,
    ExchangeBikeDetails, Listing, ListingFilter, ListingStateMachine, ProposalRequest,
    RentRequest, Transition, ValuateExchangeRequest,
};
use crate::models::Actor;
use crate::notifier::EventDispatcher;
use crate::store::{ListingStore, ValuationRuleStore};
use crate::valuation::{
    valuate, EngineBracket, EstimateValuationRequest, UpsertValuationRuleRequest, ValuationEstimate,
    ValuationRule,
};

/// Read-modify-write attempts before a command gives up on a contended listing
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Listing service for the marketplace transaction lifecycle
pub struct ListingService {
    listings: Arc<dyn ListingStore>,
    rules: Arc<dyn ValuationRuleStore>,
    dispatcher: EventDispatcher,
    machine: ListingStateMachine,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        rules: Arc<dyn ValuationRuleStore>,
        dispatcher: EventDispatcher,
        machine: ListingStateMachine,
    ) -> Self {
        Self {
            listings,
            rules,
            dispatcher,
            machine,
        }
    }

    /// Create a listing owned by `seller`
    pub async fn create_listing(
        &self,
        seller: &Actor,
        request: CreateListingRequest,
    ) -> Result<Listing, TransactionError> {
        let transition = self.machine.create_listing(seller, request)?;
        let listing = self.listings.create(&transition.listing).await?;
        self.dispatcher.dispatch(transition.events);

        Ok(listing)
    }

    /// Get a single listing by ID
    pub async fn get_listing(&self, id: Uuid) -> Result<Listing, TransactionError> {
        self.listings
            .find(id)
            .await?
            .ok_or_else(|| TransactionError::listing_not_found(id))
    }

    /// List listings with filtering and pagination
    pub async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, TransactionError> {
        Ok(self.listings.query(filter).await?)
    }

    pub async fn propose_or_counter(
        &self,
        id: Uuid,
        dealer: &Actor,
        request: ProposalRequest,
    ) -> Result<Listing, TransactionError> {
        self.apply(id, |listing| self.machine.propose_or_counter(listing, dealer, &request))
            .await
    }

    pub async fn counter_offer(
        &self,
        id: Uuid,
        owner: &Actor,
        request: CounterOfferRequest,
    ) -> Result<Listing, TransactionError> {
        self.apply(id, |listing| self.machine.counter_offer(listing, owner, &request))
            .await
    }

    pub async fn confirm_sale(
        &self,
        id: Uuid,
        actor: &Actor,
        request: ConfirmSaleRequest,
    ) -> Result<Listing, TransactionError> {
        let payment = request.into_payment_info()?;
        self.apply(id, |listing| self.machine.confirm_sale(listing, actor, payment.clone()))
            .await
    }

    pub async fn complete_payment(
        &self,
        id: Uuid,
        dealer: &Actor,
        request: CompletePaymentRequest,
    ) -> Result<Listing, TransactionError> {
        self.apply(id, |listing| self.machine.complete_payment(listing, dealer, &request))
            .await
    }

    pub async fn rent_bike(
        &self,
        id: Uuid,
        renter: &Actor,
        request: RentRequest,
    ) -> Result<Listing, TransactionError> {
        let booking = request.into_booking(Utc::now().date_naive())?;
        self.apply(id, |listing| self.machine.rent_bike(listing, renter, booking.clone()))
            .await
    }

    /// Attach a trade-in to a sale, valued against the current rule for its bracket
    pub async fn request_exchange(
        &self,
        id: Uuid,
        actor: &Actor,
        details: ExchangeBikeDetails,
    ) -> Result<Listing, TransactionError> {
        details.validate()?;
        let bracket = EngineBracket::for_capacity(details.engine_capacity);
        let rule = self.rules.find(bracket).await?;
        let current_year = Utc::now().year();

        self.apply(id, |listing| {
            self.machine.request_exchange(
                listing,
                actor,
                details.clone(),
                rule.as_ref(),
                current_year,
            )
        })
        .await
    }

    pub async fn valuate_exchange(
        &self,
        id: Uuid,
        admin: &Actor,
        request: ValuateExchangeRequest,
    ) -> Result<Listing, TransactionError> {
        self.apply(id, |listing| self.machine.valuate_exchange(listing, admin, &request))
            .await
    }

    pub async fn list_valuation_rules(&self) -> Result<Vec<ValuationRule>, TransactionError> {
        Ok(self.rules.list().await?)
    }

    pub async fn upsert_valuation_rule(
        &self,
        admin: &Actor,
        bracket: EngineBracket,
        request: UpsertValuationRuleRequest,
    ) -> Result<ValuationRule, TransactionError> {
        if !admin.is_admin() {
            return Err(TransactionError::Unauthorized(
                "Only admins can change valuation rules".to_string(),
            ));
        }
        request.validate()?;

        let rule = self.rules.upsert(&request.into_rule(bracket)).await?;
        tracing::info!(bracket = %bracket, admin_id = %admin.id, "valuation rule saved");
        Ok(rule)
    }

    /// Quote a trade-in without touching any listing
    pub async fn estimate_valuation(
        &self,
        request: EstimateValuationRequest,
    ) -> Result<ValuationEstimate, TransactionError> {
        request.validate()?;
        let bracket = EngineBracket::for_capacity(request.engine_capacity);
        let rule = self.rules.find(bracket).await?;
        let valuation = valuate(
            request.engine_capacity,
            request.year,
            request.condition,
            rule.as_ref(),
            Utc::now().year(),
        );

        Ok(ValuationEstimate {
            bracket,
            value: valuation.value,
            status: valuation.status,
        })
    }

    // ===== Private Helper Methods =====

    /// Load, transform and save a listing, retrying when another writer got there
    /// first. Events are dispatched only for the write that sticks.
    async fn apply<F>(&self, id: Uuid, command: F) -> Result<Listing, TransactionError>
    where
        F: Fn(&Listing) -> Result<Transition, TransactionError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_listing(id).await?;
            let transition = command(&current)?;

            match self.listings.save(&transition.listing, current.version).await {
                Ok(saved) => {
                    tracing::info!(
                        listing_id = %id,
                        status = ?saved.status,
                        version = saved.version,
                        "listing updated"
                    );
                    self.dispatcher.dispatch(transition.events);
                    return Ok(saved);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(listing_id = %id, attempt, "concurrent write, retrying");
                }
                Err(StoreError::NotFound(_)) => return Err(TransactionError::listing_not_found(id)),
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(listing_id = %id, "giving up after repeated concurrent writes");
        Err(TransactionError::Conflict(format!(
            "Listing {id} is being modified by another request, please retry"
        )))
    }
}
