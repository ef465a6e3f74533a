//! Notification events emitted by listing transitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Listing, ListingStatus, PaymentMethod};

/// Who a notification is addressed to. References are resolved by the notifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    User(Uuid),
    /// Everyone staffing the dealership inbox
    Dealers,
    Admins,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ListingSubmitted,
    DealerResponded,
    CounterOffered,
    SaleConfirmed,
    ConfirmationReceipt,
    PaymentCompleted,
    RentalBooked,
    VehicleBooked,
    ExchangeRequested,
    ExchangeValuated,
}

/// Outbound notification, dispatched after the transition commits
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub kind: EventKind,
    pub listing_id: Uuid,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    /// File references; resolved to URLs before delivery
    pub attachments: Vec<String>,
}

impl TransactionEvent {
    fn new(kind: EventKind, listing: &Listing, recipient: Recipient, subject: String, body: String) -> Self {
        Self {
            kind,
            listing_id: listing.id,
            recipient,
            subject,
            body,
            attachments: Vec::new(),
        }
    }

    fn with_attachments(mut self, attachments: impl IntoIterator<Item = String>) -> Self {
        self.attachments.extend(attachments);
        self
    }
}

fn title(listing: &Listing) -> String {
    format!("{} {} {} ({})", listing.model_year, listing.brand, listing.model, listing.name)
}

fn status_label(status: ListingStatus) -> &'static str {
    match status {
        ListingStatus::Available => "available",
        ListingStatus::PendingReview => "pending review",
        ListingStatus::Negotiating => "under negotiation",
        ListingStatus::Countered => "countered",
        ListingStatus::Approved => "approved",
        ListingStatus::Purchased => "purchased",
        ListingStatus::Rented => "rented",
        ListingStatus::Rejected => "rejected",
    }
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Qr => "QR",
        PaymentMethod::Cash => "Cash",
        PaymentMethod::BankTransfer => "Bank Transfer",
        PaymentMethod::None => "None",
    }
}

pub fn listing_submitted(listing: &Listing) -> TransactionEvent {
    TransactionEvent::new(
        EventKind::ListingSubmitted,
        listing,
        Recipient::Dealers,
        format!("New listing awaiting review: {}", listing.name),
        format!(
            "{} was submitted with an asking price of {} and needs a dealer review.",
            title(listing),
            listing.price
        ),
    )
}

pub fn dealer_responded(listing: &Listing) -> TransactionEvent {
    let mut body = format!(
        "The dealer marked {} as {} with a price of {}.",
        title(listing),
        status_label(listing.status),
        listing.negotiated_price
    );
    if let Some(note) = &listing.dealer_note {
        body.push_str(&format!(" Note from the dealer: {note}"));
    }

    TransactionEvent::new(
        EventKind::DealerResponded,
        listing,
        Recipient::User(listing.seller_id),
        format!("Dealer responded to your listing: {}", listing.name),
        body,
    )
}

pub fn counter_offered(listing: &Listing) -> TransactionEvent {
    TransactionEvent::new(
        EventKind::CounterOffered,
        listing,
        Recipient::Dealers,
        format!("Counter-offer received: {}", listing.name),
        format!(
            "The seller of {} countered with {} (dealer proposal was {}).",
            title(listing),
            listing.user_counter_price,
            listing.negotiated_price
        ),
    )
}

pub fn sale_confirmed(listing: &Listing, confirmed_by: Uuid) -> Vec<TransactionEvent> {
    let method = payment_label(listing.payment_method);
    let mut dealer_body = format!(
        "{} was confirmed by {} for {} via {}.",
        title(listing),
        confirmed_by,
        listing.final_price,
        method
    );
    if listing.is_exchange && listing.exchange_valuation > 0 {
        dealer_body.push_str(&format!(
            " A trade-in valued at {} was deducted.",
            listing.exchange_valuation
        ));
    }
    if let Some(address) = &listing.delivery_address {
        dealer_body.push_str(&format!(" Delivery address: {address}."));
    }

    let dealer = TransactionEvent::new(
        EventKind::SaleConfirmed,
        listing,
        Recipient::Dealers,
        format!("Sale confirmed: {}", listing.name),
        dealer_body,
    )
    .with_attachments(listing.user_qr_image.clone());

    let receipt = TransactionEvent::new(
        EventKind::ConfirmationReceipt,
        listing,
        Recipient::User(confirmed_by),
        format!("Your confirmation for {}", listing.name),
        format!(
            "You confirmed {}. Amount due: {} via {}.",
            title(listing),
            listing.final_price,
            method
        ),
    );

    vec![dealer, receipt]
}

pub fn payment_completed(listing: &Listing) -> TransactionEvent {
    let mut body = format!("Payment for {} has been completed.", title(listing));
    if let Some(message) = &listing.payment_message {
        body.push_str(&format!(" Message: {message}"));
    }

    TransactionEvent::new(
        EventKind::PaymentCompleted,
        listing,
        Recipient::User(listing.seller_id),
        format!("Payment completed: {}", listing.name),
        body,
    )
    .with_attachments(listing.payment_screenshot.clone())
}

pub fn rental_booked(listing: &Listing, renter: Uuid) -> Vec<TransactionEvent> {
    let expiry = listing
        .rental_expiry
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let start = listing
        .booking_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let renter_event = TransactionEvent::new(
        EventKind::RentalBooked,
        listing,
        Recipient::User(renter),
        format!("Booking confirmed: {}", listing.name),
        format!("Your rental of {} runs from {start} until {expiry}.", title(listing)),
    );

    let seller_event = TransactionEvent::new(
        EventKind::VehicleBooked,
        listing,
        Recipient::User(listing.seller_id),
        format!("Your vehicle was booked: {}", listing.name),
        format!("{} is rented from {start} until {expiry}.", title(listing)),
    );

    vec![renter_event, seller_event]
}

pub fn exchange_requested(listing: &Listing) -> TransactionEvent {
    let (details, photos) = match &listing.exchange_bike_details {
        Some(details) => (
            format!(
                "{} {} {} ({}cc)",
                details.year, details.brand, details.model, details.engine_capacity
            ),
            details.photos.clone(),
        ),
        None => ("a vehicle".to_string(), Vec::new()),
    };
    let estimate = if listing.exchange_valuation > 0 {
        format!("estimated at {}", listing.exchange_valuation)
    } else {
        "awaiting manual valuation".to_string()
    };

    TransactionEvent::new(
        EventKind::ExchangeRequested,
        listing,
        Recipient::Dealers,
        format!("Exchange requested: {}", listing.name),
        format!("{details} was offered in exchange for {}, {estimate}.", title(listing)),
    )
    .with_attachments(photos)
}

pub fn exchange_valuated(listing: &Listing, recipient: Uuid) -> TransactionEvent {
    TransactionEvent::new(
        EventKind::ExchangeValuated,
        listing,
        Recipient::User(recipient),
        format!("Exchange valuated: {}", listing.name),
        format!(
            "Your trade-in against {} is valued at {}.",
            title(listing),
            listing.exchange_valuation
        ),
    )
}
