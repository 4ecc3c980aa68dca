//! The metadata contract between checkout-session creation and the completion webhook.
//!
//! Whatever the gateway attaches to a session's metadata bag comes back verbatim on the completion event, string
//! values only. [`SessionMetadata`] is the typed view of that bag: the encode side is used when creating sessions,
//! the decode side when a completion webhook arrives. Unparseable values decode to `None` rather than failing the
//! delivery; a payment with partial metadata still has to be recorded.

use std::collections::HashMap;

use booking_engine::PaymentFacts;
use brg_common::Euros;
use chrono::{DateTime, Utc};
use log::warn;
use stripe_tools::CheckoutSession;

pub const META_ORDER_ID: &str = "order_id";
pub const META_PRODUCT_ID: &str = "product_id";
pub const META_PRICE: &str = "price";
pub const META_RESERVATION_ID: &str = "reservation_id";
pub const META_DISPLAY_HANDLE: &str = "display_handle";
pub const META_NOTE: &str = "note";
pub const META_CUSTOMER_EMAIL: &str = "customer_email";
pub const META_START_AT: &str = "start_at";
pub const META_END_AT: &str = "end_at";

#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub order_id: Option<i64>,
    pub product_id: Option<i64>,
    /// Price in whole euros.
    pub price: Option<Euros>,
    pub reservation_id: Option<String>,
    pub display_handle: Option<String>,
    pub note: Option<String>,
    pub customer_email: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl SessionMetadata {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            order_id: parse_i64(map, META_ORDER_ID),
            product_id: parse_i64(map, META_PRODUCT_ID),
            price: parse_i64(map, META_PRICE).map(Euros::from),
            reservation_id: non_empty(map, META_RESERVATION_ID),
            display_handle: non_empty(map, META_DISPLAY_HANDLE),
            note: non_empty(map, META_NOTE),
            customer_email: non_empty(map, META_CUSTOMER_EMAIL),
            start_at: parse_timestamp(map, META_START_AT),
            end_at: parse_timestamp(map, META_END_AT),
        }
    }

    /// Encode to the string bag attached to a new checkout session. `None` fields are omitted entirely.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(id) = self.order_id {
            map.insert(META_ORDER_ID.to_string(), id.to_string());
        }
        if let Some(id) = self.product_id {
            map.insert(META_PRODUCT_ID.to_string(), id.to_string());
        }
        if let Some(price) = self.price {
            map.insert(META_PRICE.to_string(), price.value().to_string());
        }
        if let Some(v) = &self.reservation_id {
            map.insert(META_RESERVATION_ID.to_string(), v.clone());
        }
        if let Some(v) = &self.display_handle {
            map.insert(META_DISPLAY_HANDLE.to_string(), v.clone());
        }
        if let Some(v) = &self.note {
            map.insert(META_NOTE.to_string(), v.clone());
        }
        if let Some(v) = &self.customer_email {
            map.insert(META_CUSTOMER_EMAIL.to_string(), v.clone());
        }
        if let Some(t) = self.start_at {
            map.insert(META_START_AT.to_string(), t.to_rfc3339());
        }
        if let Some(t) = self.end_at {
            map.insert(META_END_AT.to_string(), t.to_rfc3339());
        }
        map
    }
}

fn parse_i64(map: &HashMap<String, String>, key: &str) -> Option<i64> {
    let raw = map.get(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("💳️ Ignoring non-numeric session metadata value {key}={raw}");
            None
        },
    }
}

fn non_empty(map: &HashMap<String, String>, key: &str) -> Option<String> {
    map.get(key).filter(|s| !s.is_empty()).cloned()
}

fn parse_timestamp(map: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    let raw = map.get(key)?;
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Flatten a completed checkout session into the facts the reconciliation engine consumes. The payer email from
/// the session itself wins over the one stashed in metadata; the payment reference falls back from the payment
/// intent to the session id when the intent is absent.
pub fn payment_facts_from_session(session: &CheckoutSession) -> PaymentFacts {
    let empty = HashMap::new();
    let meta = SessionMetadata::from_map(session.metadata.as_ref().unwrap_or(&empty));
    let customer_email = session.payer_email().map(String::from).or(meta.customer_email);
    PaymentFacts {
        order_id: meta.order_id,
        product_id: meta.product_id,
        meta_price: meta.price,
        customer_email,
        reservation_id: meta.reservation_id,
        display_handle: meta.display_handle,
        note: meta.note,
        start_at: meta.start_at,
        end_at: meta.end_at,
        amount: Euros::from_cents(session.amount_total.unwrap_or(0)),
        payment_ref: session.payment_intent.clone().filter(|s| !s.is_empty()),
        session_ref: session.id.clone(),
    }
}
