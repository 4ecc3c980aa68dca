//! Scheduling-provider event parsing.
//!
//! The provider's webhook payloads are not stable across versions or embed modes: the event label moves between
//! `triggerEvent`, `type` and `event.type`, the booking object moves between `payload.booking`, `booking` and
//! `payload`, and the labels themselves arrive either as machine tokens (`BOOKING_CREATED`) or as localized
//! human-readable phrases ("Réservation créée"). This module flattens all of that into a [`CalEvent`]: a normalized
//! lifecycle kind plus the [`BookingFacts`] the reconciliation engine needs.

use std::fmt::{Display, Formatter};

use booking_engine::BookingFacts;
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEventKind {
    Created,
    Rescheduled,
    Cancelled,
    Unknown,
}

impl Display for BookingEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct CalEvent {
    pub kind: BookingEventKind,
    /// The raw label the kind was derived from. Kept for logging.
    pub label: String,
    pub facts: BookingFacts,
}

/// Map an event label to a lifecycle kind. Matching is by case-insensitive substring because the provider emits
/// both machine tokens and localized phrases, and the phrases vary with conjugation ("créée" vs "créé").
pub fn normalize_event_label(label: &str) -> BookingEventKind {
    let label = label.to_lowercase();
    if label.contains("créée") || label.contains("créé") || label.contains("cree") {
        return BookingEventKind::Created;
    }
    if label.contains("replanifi") {
        return BookingEventKind::Rescheduled;
    }
    if label.contains("annul") {
        return BookingEventKind::Cancelled;
    }
    if label.contains("booking_created") {
        return BookingEventKind::Created;
    }
    if label.contains("booking_rescheduled") {
        return BookingEventKind::Rescheduled;
    }
    if label.contains("booking_cancel") {
        return BookingEventKind::Cancelled;
    }
    BookingEventKind::Unknown
}

/// Parse a webhook body into a normalized event. Never fails: missing pieces become `None` facts and unrecognized
/// labels become [`BookingEventKind::Unknown`], which the handler acknowledges without touching the store.
pub fn parse_cal_event(body: &Value) -> CalEvent {
    let label = body
        .get("triggerEvent")
        .and_then(Value::as_str)
        .or_else(|| body.get("type").and_then(Value::as_str))
        .or_else(|| body.pointer("/event/type").and_then(Value::as_str))
        .unwrap_or("UNKNOWN")
        .to_string();
    let kind = normalize_event_label(&label);
    let booking = body
        .pointer("/payload/booking")
        .or_else(|| body.get("booking"))
        .or_else(|| body.get("payload"))
        .cloned()
        .unwrap_or(Value::Null);
    let facts = extract_booking_facts(&booking, body);
    CalEvent { kind, label, facts }
}

fn extract_booking_facts(booking: &Value, body: &Value) -> BookingFacts {
    let metadata = booking.get("metadata");
    let order_id = metadata.and_then(|m| m.get("order_id")).and_then(value_as_i64);
    let product_id = metadata.and_then(|m| m.get("product_id")).and_then(value_as_i64);
    let reservation_id = booking
        .get("uid")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| booking.get("id").map(value_to_plain_string));
    let customer_email = booking
        .pointer("/attendees/0/email")
        .or_else(|| booking.pointer("/attendee/email"))
        .or_else(|| body.pointer("/payload/email"))
        .and_then(Value::as_str)
        .map(String::from);
    let start_at = booking.get("startTime").or_else(|| booking.get("start")).and_then(value_as_timestamp);
    let end_at = booking.get("endTime").or_else(|| booking.get("end")).and_then(value_as_timestamp);
    BookingFacts { order_id, product_id, reservation_id, customer_email, start_at, end_at }
}

// Metadata values echoed back through the booking widget arrive as strings, direct API payloads carry numbers.
fn value_as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}
