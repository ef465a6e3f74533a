//! Final price settlement

/// Amount the counterparty owes once negotiation and any trade-in are accounted for.
///
/// A non-positive negotiated price means no price was agreed and the asking price
/// applies. The trade-in valuation only counts when the listing is an exchange and the
/// valuation is positive. The result never goes below zero.
pub fn settle_price(
    asking_price: i64,
    negotiated_price: i64,
    is_exchange: bool,
    exchange_valuation: i64,
) -> i64 {
    let base = if negotiated_price > 0 {
        negotiated_price
    } else {
        asking_price.max(0)
    };

    if is_exchange && exchange_valuation > 0 {
        base.saturating_sub(exchange_valuation).max(0)
    } else {
        base
    }
}
