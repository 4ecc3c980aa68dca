//! The matching precedence that associates incoming webhook events with existing orders.
//!
//! Each strategy is a pure function from (event facts, candidate-order snapshot) to an optional order id, so the
//! precedence can be tested without any handler or database glue. The ordered lists [`BOOKING_MATCHERS`] and
//! [`PAYMENT_MATCHERS`] are the single source of truth for precedence; callers take the first hit.
//!
//! Candidate snapshots are fetched by the API layer with a single query per event (see
//! [`crate::traits::ReconciliationDatabase`]). There is no transaction spanning the snapshot and the subsequent
//! write, so concurrent deliveries for the same order can race; the store settles to eventual consistency.

use brg_common::Euros;
use chrono::{DateTime, Utc};

use crate::db_types::{Order, OrderStatus};

//--------------------------------------    BookingFacts     ---------------------------------------------------------
/// The facts extracted from a scheduling-provider booking event, after normalization.
#[derive(Debug, Clone, Default)]
pub struct BookingFacts {
    /// Explicit order id carried in the widget metadata, when the client created the order before booking.
    pub order_id: Option<i64>,
    /// Product reference carried in the widget metadata.
    pub product_id: Option<i64>,
    pub reservation_id: Option<String>,
    pub customer_email: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

//--------------------------------------    PaymentFacts     ---------------------------------------------------------
/// The facts extracted from a completed checkout session: session-level details plus the metadata bag that was
/// attached when the session was created.
#[derive(Debug, Clone, Default)]
pub struct PaymentFacts {
    pub order_id: Option<i64>,
    pub product_id: Option<i64>,
    /// Price carried in session metadata, in whole euros.
    pub meta_price: Option<Euros>,
    pub customer_email: Option<String>,
    pub reservation_id: Option<String>,
    pub display_handle: Option<String>,
    pub note: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// The session total, converted to whole euros.
    pub amount: Euros,
    /// Payment-intent reference; absent for some zero-interaction sessions.
    pub payment_ref: Option<String>,
    pub session_ref: String,
}

//--------------------------------------      Matchers       ---------------------------------------------------------
pub type BookingMatcher = fn(&BookingFacts, &[Order]) -> Option<i64>;
pub type PaymentMatcher = fn(&PaymentFacts, &[Order]) -> Option<i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHit {
    pub order_id: i64,
    /// The name of the rule that produced the hit. Logged so that surprising associations can be audited.
    pub rule: &'static str,
}

/// Booking-event precedence: explicit order id, then reservation id, then the most recent unpaid order for the
/// attendee's email. First hit wins. No hit means the caller inserts a fresh order.
pub const BOOKING_MATCHERS: &[(&str, BookingMatcher)] = &[
    ("metadata order id", booking_by_order_id),
    ("reservation id", booking_by_reservation_id),
    ("latest unpaid order for email", booking_by_email),
];

/// Payment-event precedence when no explicit order id was carried in the session metadata: the most recent unpaid
/// order for the payer's email, then the most recent awaiting-payment order for the product reference.
pub const PAYMENT_MATCHERS: &[(&str, PaymentMatcher)] =
    &[("latest unpaid order for email", payment_by_email), ("latest awaiting order for product", payment_by_product)];

pub fn select_booking_match(facts: &BookingFacts, orders: &[Order]) -> Option<MatchHit> {
    BOOKING_MATCHERS
        .iter()
        .find_map(|(rule, matcher)| matcher(facts, orders).map(|order_id| MatchHit { order_id, rule }))
}

pub fn select_payment_match(facts: &PaymentFacts, orders: &[Order]) -> Option<MatchHit> {
    PAYMENT_MATCHERS
        .iter()
        .find_map(|(rule, matcher)| matcher(facts, orders).map(|order_id| MatchHit { order_id, rule }))
}

/// An explicit order id always matches, whether or not the order is in the snapshot. The update that follows is
/// where a stale reference surfaces (zero rows updated is an error, per the documented policy).
fn booking_by_order_id(facts: &BookingFacts, _orders: &[Order]) -> Option<i64> {
    facts.order_id
}

fn booking_by_reservation_id(facts: &BookingFacts, orders: &[Order]) -> Option<i64> {
    let reservation_id = facts.reservation_id.as_deref()?;
    orders.iter().filter(|o| o.reservation_id.as_deref() == Some(reservation_id)).map(|o| o.id).max()
}

fn booking_by_email(facts: &BookingFacts, orders: &[Order]) -> Option<i64> {
    latest_unpaid_for_email(facts.customer_email.as_deref()?, orders)
}

fn payment_by_email(facts: &PaymentFacts, orders: &[Order]) -> Option<i64> {
    latest_unpaid_for_email(facts.customer_email.as_deref()?, orders)
}

fn payment_by_product(facts: &PaymentFacts, orders: &[Order]) -> Option<i64> {
    let product_id = facts.product_id?;
    orders
        .iter()
        .filter(|o| o.product_id == Some(product_id) && o.status == OrderStatus::AwaitingPayment)
        .map(|o| o.id)
        .max()
}

/// Most recent (highest id) order for the email that has not been paid. Cancelled orders are eligible on purpose:
/// a customer who re-books after cancelling gets their original order revived rather than a duplicate.
fn latest_unpaid_for_email(email: &str, orders: &[Order]) -> Option<i64> {
    orders
        .iter()
        .filter(|o| o.customer_email.as_deref() == Some(email) && o.status != OrderStatus::Paid)
        .map(|o| o.id)
        .max()
}

//--------------------------------------   Price resolution  ---------------------------------------------------------
/// Resolve the price to record at the paid transition. The order is total and must not change: a price already on
/// the order wins, then the price carried in session metadata, then the catalog price for the product, and only
/// then the amount actually charged. This is what reconciles catalog price drift against the charged amount.
pub fn resolve_price(stored: Option<Euros>, meta: Option<Euros>, catalog: Option<Euros>, charged: Euros) -> Euros {
    stored.or(meta).or(catalog).unwrap_or(charged)
}
