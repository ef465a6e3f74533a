//! Vehicle listings: model, status, request DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::error::TransactionError;
use crate::rental::RentalPlan;
use crate::valuation::ExchangeCondition;

pub mod events;
pub mod state_machine;

pub use events::{EventKind, Recipient, TransactionEvent};
pub use state_machine::{ListingStateMachine, Transition, TransitionPolicy};

/// Listing model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    /// Account that listed the vehicle
    pub seller_id: Uuid,

    pub name: String,
    pub brand: String,
    pub model: String,
    pub model_year: i32,
    pub engine_capacity: f64,
    pub mileage: i64,
    pub category: String,
    pub condition: String,

    pub listing_type: ListingType,
    pub price: i64,
    /// 0 until a dealer proposes a price
    pub negotiated_price: i64,
    pub user_counter_price: i64,
    /// Settlement amount recorded at confirmation
    pub final_price: i64,
    pub status: ListingStatus,

    pub user_confirmed: bool,
    pub purchased_by: Option<Uuid>,

    pub payment_method: PaymentMethod,
    pub user_bank_details: Option<String>,
    pub user_qr_image: Option<String>,
    pub payment_screenshot: Option<String>,
    pub payment_message: Option<String>,
    pub dealer_note: Option<String>,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,

    pub rental_plan: Option<RentalPlan>,
    pub booking_date: Option<NaiveDate>,
    pub rental_duration: Option<i32>,
    pub rental_expiry: Option<NaiveDate>,
    pub rented_by: Option<Uuid>,

    pub is_exchange: bool,
    pub exchange_bike_details: Option<Json<ExchangeBikeDetails>>,
    pub exchange_valuation: i64,
    pub exchange_status: Option<ExchangeStatus>,
    pub exchange_requested_by: Option<Uuid>,

    /// Bumped on every successful save
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "listing_type", rename_all = "lowercase")]
pub enum ListingType {
    Rental,
    Sale,
    /// A user offering their vehicle to the dealership
    Purchase,
}

/// Listing status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "listing_status", rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    PendingReview,
    Negotiating,
    Countered,
    Approved,
    Purchased,
    Rented,
    Rejected,
}

impl ListingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::Purchased | ListingStatus::Rejected)
    }

    /// Transition table. Terminal states only loop on themselves (`Rejected` not even
    /// that), a rental cycle only re-enters `Rented`, and nothing returns to an
    /// initial state.
    pub fn permits(&self, next: ListingStatus) -> bool {
        match self {
            ListingStatus::Purchased => next == ListingStatus::Purchased,
            ListingStatus::Rejected => false,
            ListingStatus::Rented => next == ListingStatus::Rented,
            _ => !matches!(next, ListingStatus::Available | ListingStatus::PendingReview),
        }
    }
}

/// Payment methods
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(rename = "QR")]
    Qr,
    Cash,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[default]
    None,
}

/// Trade-in valuation status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "exchange_status", rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Valuated,
}

/// Vehicle offered in exchange
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBikeDetails {
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,
    #[validate(range(min = 0.0))]
    pub engine_capacity: f64,
    #[serde(default)]
    pub condition: ExchangeCondition,
    /// Uploaded photo references
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Request DTO for creating a listing
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100))]
    pub model_year: i32,
    #[validate(range(min = 0.0))]
    pub engine_capacity: f64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub mileage: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    pub listing_type: ListingType,
    #[validate(range(min = 1))]
    pub price: i64,
}

/// Dealer proposal or counter-proposal
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequest {
    pub status: ListingStatus,
    #[validate(range(min = 0))]
    pub negotiated_price: i64,
    #[validate(length(max = 2000))]
    pub dealer_note: Option<String>,
}

/// Seller's counter-offer
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CounterOfferRequest {
    #[validate(range(min = 1))]
    pub user_counter_price: i64,
}

/// Sale confirmation as submitted
#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSaleRequest {
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 1000))]
    pub user_bank_details: Option<String>,
    pub user_qr_image: Option<String>,
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 32))]
    pub contact_number: Option<String>,
}

/// Validated payment details for a sale confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub bank_details: Option<String>,
    pub qr_image: Option<String>,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,
}

impl ConfirmSaleRequest {
    /// Apply the cash default and check the method has what it needs.
    pub fn into_payment_info(self) -> Result<PaymentInfo, TransactionError> {
        self.validate()?;

        let method = match self.payment_method {
            None | Some(PaymentMethod::None) => PaymentMethod::Cash,
            Some(method) => method,
        };
        let bank_details = non_blank(self.user_bank_details);
        let qr_image = non_blank(self.user_qr_image);

        match method {
            PaymentMethod::BankTransfer if bank_details.is_none() => {
                return Err(TransactionError::Validation(
                    "Bank transfer requires bank details".to_string(),
                ));
            }
            PaymentMethod::Qr if qr_image.is_none() => {
                return Err(TransactionError::Validation(
                    "QR payment requires a QR image".to_string(),
                ));
            }
            _ => {}
        }

        Ok(PaymentInfo {
            method,
            bank_details,
            qr_image,
            delivery_address: non_blank(self.delivery_address),
            contact_number: non_blank(self.contact_number),
        })
    }
}

/// Payment proof uploaded by the dealer
#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    #[validate(length(max = 2000))]
    pub payment_message: Option<String>,
    pub payment_screenshot: Option<String>,
}

/// Rental booking as submitted
#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    pub booking_date: Option<NaiveDate>,
    pub rental_plan: Option<RentalPlan>,
    #[serde(default, deserialize_with = "crate::rental::deserialize_duration")]
    pub rental_duration: Option<f64>,
    #[validate(length(max = 32))]
    pub contact_number: Option<String>,
}

/// Normalized rental booking
#[derive(Debug, Clone, PartialEq)]
pub struct RentalBooking {
    pub booking_date: NaiveDate,
    pub plan: RentalPlan,
    pub duration: Option<f64>,
    pub contact_number: Option<String>,
}

impl RentRequest {
    /// Bookings without a date start `today`.
    pub fn into_booking(self, today: NaiveDate) -> Result<RentalBooking, TransactionError> {
        self.validate()?;

        Ok(RentalBooking {
            booking_date: self.booking_date.unwrap_or(today),
            plan: self.rental_plan.unwrap_or_default(),
            duration: self.rental_duration,
            contact_number: non_blank(self.contact_number),
        })
    }
}

/// Admin override of a trade-in valuation
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValuateExchangeRequest {
    pub exchange_valuation: i64,
    pub status: ExchangeStatus,
}

/// Query parameters for listing listings
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub status: Option<ListingStatus>,
    pub listing_type: Option<ListingType>,
    pub seller_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListingFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.status.map_or(true, |s| listing.status == s)
            && self.listing_type.map_or(true, |t| listing.listing_type == t)
            && self.seller_id.map_or(true, |id| listing.seller_id == id)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
