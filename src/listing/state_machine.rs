//! Listing state machine
//!
//! Every command is a pure function of the current listing, the acting account and
//! the command input. It returns the next listing together with the notifications the
//! change produces, or a [`TransactionError`] with the listing left untouched.
//! Persisting the result and delivering the events is up to the caller.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use super::events;
use super::{
    CompletePaymentRequest, CounterOfferRequest, CreateListingRequest, ExchangeBikeDetails, Listing,
    ListingStatus, ListingType, PaymentInfo, PaymentMethod,
    ProposalRequest, RentalBooking, TransactionEvent, ValuateExchangeRequest,
};
use crate::error::TransactionError;
use crate::models::Actor;
use crate::rental::{normalize_duration, rental_expiry};
use crate::settlement::settle_price;
use crate::valuation::{valuate, ValuationRule};

/// Result of a successful command
#[derive(Debug, Clone)]
pub struct Transition {
    pub listing: Listing,
    pub events: Vec<TransactionEvent>,
}

impl Transition {
    fn new(listing: Listing, events: Vec<TransactionEvent>) -> Self {
        Self { listing, events }
    }
}

/// How strictly commands issued out of the usual flow are gated.
///
/// Covers sale confirmation and payment completion before approval, renting a listing
/// that is not a rental, and exchanges on a closed listing. Permissive mode accepts
/// them with a warning; strict mode rejects them. The transition table applies either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionPolicy {
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingStateMachine {
    policy: TransitionPolicy,
}

impl ListingStateMachine {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Create a listing. Dealer-side listings and rentals are published straight away;
    /// sale and purchase listings from ordinary users wait for a dealer review.
    pub fn create_listing(
        &self,
        seller: &Actor,
        request: CreateListingRequest,
    ) -> Result<Transition, TransactionError> {
        request.validate()?;

        let status = if seller.role.is_dealer_side() || seller.is_admin() {
            ListingStatus::Available
        } else {
            match request.listing_type {
                ListingType::Rental => ListingStatus::Available,
                ListingType::Sale | ListingType::Purchase => ListingStatus::PendingReview,
            }
        };

        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            seller_id: seller.id,
            name: request.name.trim().to_string(),
            brand: request.brand.trim().to_string(),
            model: request.model.trim().to_string(),
            model_year: request.model_year,
            engine_capacity: request.engine_capacity,
            mileage: request.mileage,
            category: request.category,
            condition: request.condition,
            listing_type: request.listing_type,
            price: request.price,
            negotiated_price: 0,
            user_counter_price: 0,
            final_price: 0,
            status,
            user_confirmed: false,
            purchased_by: None,
            payment_method: PaymentMethod::None,
            user_bank_details: None,
            user_qr_image: None,
            payment_screenshot: None,
            payment_message: None,
            dealer_note: None,
            delivery_address: None,
            contact_number: None,
            rental_plan: None,
            booking_date: None,
            rental_duration: None,
            rental_expiry: None,
            rented_by: None,
            is_exchange: false,
            exchange_bike_details: None,
            exchange_valuation: 0,
            exchange_status: None,
            exchange_requested_by: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let events = if status == ListingStatus::PendingReview {
            vec![events::listing_submitted(&listing)]
        } else {
            Vec::new()
        };

        tracing::info!(listing_id = %listing.id, seller_id = %seller.id, status = ?status, "listing created");
        Ok(Transition::new(listing, events))
    }

    /// Dealer moves a listing under review or negotiation to `Negotiating`, `Approved`
    /// or `Rejected`, quoting a price and an optional note.
    pub fn propose_or_counter(
        &self,
        listing: &Listing,
        dealer: &Actor,
        request: &ProposalRequest,
    ) -> Result<Transition, TransactionError> {
        if !dealer.can_deal() {
            return Err(TransactionError::Unauthorized(
                "Only dealers can respond to a listing".to_string(),
            ));
        }
        request.validate()?;

        if !matches!(
            request.status,
            ListingStatus::Negotiating | ListingStatus::Approved | ListingStatus::Rejected
        ) {
            return Err(TransactionError::Validation(format!(
                "A proposal must set the listing to Negotiating, Approved or Rejected, not {:?}",
                request.status
            )));
        }

        if !matches!(
            listing.status,
            ListingStatus::PendingReview | ListingStatus::Negotiating | ListingStatus::Countered
        ) {
            return Err(TransactionError::InvalidOperation(format!(
                "Listing {} is {:?} and is not open for negotiation",
                listing.id, listing.status
            )));
        }

        let mut next = listing.clone();
        advance(&mut next, request.status)?;
        next.negotiated_price = request.negotiated_price;
        next.dealer_note = request.dealer_note.clone();

        let events = vec![events::dealer_responded(&next)];
        Ok(Transition::new(next, events))
    }

    /// Seller-of-record answers a dealer proposal with their own price.
    pub fn counter_offer(
        &self,
        listing: &Listing,
        owner: &Actor,
        request: &CounterOfferRequest,
    ) -> Result<Transition, TransactionError> {
        if owner.id != listing.seller_id {
            return Err(TransactionError::Unauthorized(
                "Only the seller of this listing can counter an offer".to_string(),
            ));
        }
        request.validate()?;

        let mut next = listing.clone();
        advance(&mut next, ListingStatus::Countered)?;
        next.user_counter_price = request.user_counter_price;
        next.user_confirmed = false;

        let events = vec![events::counter_offered(&next)];
        Ok(Transition::new(next, events))
    }

    /// Counterparty confirms the deal and leaves payment details. The settlement
    /// price is recorded; a purchased listing stays purchased.
    pub fn confirm_sale(
        &self,
        listing: &Listing,
        actor: &Actor,
        payment: PaymentInfo,
    ) -> Result<Transition, TransactionError> {
        self.check_settlement_state(listing, "confirm sale")?;

        let target = if listing.status == ListingStatus::Purchased {
            ListingStatus::Purchased
        } else {
            ListingStatus::Approved
        };

        let mut next = listing.clone();
        advance(&mut next, target)?;
        next.user_confirmed = true;
        next.purchased_by = next.purchased_by.or(Some(actor.id));
        next.payment_method = payment.method;
        next.user_bank_details = payment.bank_details;
        next.user_qr_image = payment.qr_image;
        next.delivery_address = payment.delivery_address;
        next.contact_number = payment.contact_number;
        next.final_price = settle_price(
            next.price,
            next.negotiated_price,
            next.is_exchange,
            next.exchange_valuation,
        );

        let events = events::sale_confirmed(&next, actor.id);
        Ok(Transition::new(next, events))
    }

    /// Dealer records that payment went through. Closes the sale.
    pub fn complete_payment(
        &self,
        listing: &Listing,
        dealer: &Actor,
        request: &CompletePaymentRequest,
    ) -> Result<Transition, TransactionError> {
        if !dealer.can_deal() {
            return Err(TransactionError::Unauthorized(
                "Only dealers can complete a payment".to_string(),
            ));
        }
        request.validate()?;
        self.check_settlement_state(listing, "complete payment")?;

        let mut next = listing.clone();
        advance(&mut next, ListingStatus::Purchased)?;
        next.payment_message = request.payment_message.clone();
        next.payment_screenshot = request.payment_screenshot.clone();

        let events = vec![events::payment_completed(&next)];
        Ok(Transition::new(next, events))
    }

    /// Book a rental. A rented listing can only be re-booked by its current renter,
    /// which extends the term from the new booking date.
    pub fn rent_bike(
        &self,
        listing: &Listing,
        renter: &Actor,
        booking: RentalBooking,
    ) -> Result<Transition, TransactionError> {
        if listing.status == ListingStatus::Rented && listing.rented_by != Some(renter.id) {
            return Err(TransactionError::Conflict(format!(
                "Listing {} is already rented by someone else",
                listing.id
            )));
        }
        if listing.listing_type != ListingType::Rental {
            self.out_of_flow(listing, "rent a listing not offered for rent")?;
        }

        let mut next = listing.clone();
        advance(&mut next, ListingStatus::Rented)?;
        let duration = normalize_duration(booking.duration);
        next.rental_expiry = Some(rental_expiry(booking.booking_date, booking.plan, booking.duration));
        next.rental_plan = Some(booking.plan);
        next.booking_date = Some(booking.booking_date);
        next.rental_duration = Some(i32::try_from(duration).unwrap_or(i32::MAX));
        next.rented_by = Some(renter.id);
        if booking.contact_number.is_some() {
            next.contact_number = booking.contact_number;
        }

        let events = events::rental_booked(&next, renter.id);
        Ok(Transition::new(next, events))
    }

    /// Offer a vehicle in exchange. `rule` is the current valuation rule for the
    /// trade-in's engine bracket.
    pub fn request_exchange(
        &self,
        listing: &Listing,
        actor: &Actor,
        details: ExchangeBikeDetails,
        rule: Option<&ValuationRule>,
        current_year: i32,
    ) -> Result<Transition, TransactionError> {
        if !matches!(listing.listing_type, ListingType::Sale | ListingType::Purchase) {
            return Err(TransactionError::InvalidOperation(format!(
                "Exchange is only available for sale and purchase listings, not {:?}",
                listing.listing_type
            )));
        }
        if listing.status.is_terminal() {
            self.out_of_flow(listing, "request an exchange on a closed listing")?;
        }
        details.validate()?;

        let valuation = valuate(
            details.engine_capacity,
            details.year,
            details.condition,
            rule,
            current_year,
        );
        if rule.is_none() {
            tracing::warn!(
                listing_id = %listing.id,
                engine_capacity = details.engine_capacity,
                "no valuation rule for trade-in bracket, leaving exchange pending"
            );
        }

        let mut next = listing.clone();
        next.is_exchange = true;
        next.exchange_bike_details = Some(Json(details));
        next.exchange_valuation = valuation.value;
        next.exchange_status = Some(valuation.status);
        next.exchange_requested_by = Some(actor.id);

        let events = vec![events::exchange_requested(&next)];
        Ok(Transition::new(next, events))
    }

    /// Admin override of a trade-in valuation.
    pub fn valuate_exchange(
        &self,
        listing: &Listing,
        admin: &Actor,
        request: &ValuateExchangeRequest,
    ) -> Result<Transition, TransactionError> {
        if !admin.is_admin() {
            return Err(TransactionError::Unauthorized(
                "Only admins can valuate an exchange".to_string(),
            ));
        }

        let mut next = listing.clone();
        next.exchange_valuation = request.exchange_valuation.max(0);
        next.exchange_status = Some(request.status);

        let events = next
            .exchange_requested_by
            .map(|requester| vec![events::exchange_valuated(&next, requester)])
            .unwrap_or_default();
        Ok(Transition::new(next, events))
    }

    fn check_settlement_state(&self, listing: &Listing, command: &str) -> Result<(), TransactionError> {
        if matches!(listing.status, ListingStatus::Approved | ListingStatus::Purchased) {
            return Ok(());
        }
        self.out_of_flow(listing, &format!("{command} before approval"))
    }

    /// Reject in strict mode, warn and carry on otherwise.
    fn out_of_flow(&self, listing: &Listing, command: &str) -> Result<(), TransactionError> {
        if self.policy.strict {
            return Err(TransactionError::InvalidOperation(format!(
                "Cannot {command}: listing {} is a {:?} listing in {:?}",
                listing.id, listing.listing_type, listing.status
            )));
        }
        tracing::warn!(
            listing_id = %listing.id,
            listing_type = ?listing.listing_type,
            status = ?listing.status,
            command,
            "command issued out of the usual flow"
        );
        Ok(())
    }
}

/// Move `listing` to `next` if the transition table allows it.
fn advance(listing: &mut Listing, next: ListingStatus) -> Result<(), TransactionError> {
    if !listing.status.permits(next) {
        return Err(TransactionError::InvalidOperation(format!(
            "Listing {} cannot move from {:?} to {:?}",
            listing.id, listing.status, next
        )));
    }
    tracing::debug!(listing_id = %listing.id, from = ?listing.status, to = ?next, "listing transition");
    listing.status = next;
    Ok(())
}
