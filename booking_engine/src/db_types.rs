use std::{fmt::Display, str::FromStr};

use brg_common::Euros;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The booking exists but no completed payment has been matched to it yet.
    AwaitingPayment,
    /// A completed checkout session has been reconciled against the order.
    Paid,
    /// The booking was cancelled before payment. Paid orders are never moved here automatically.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::AwaitingPayment => write!(f, "awaiting_payment"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status in store: {value}. Defaulting to awaiting_payment");
            OrderStatus::AwaitingPayment
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// One customer booking/purchase, as stored. Most columns are nullable because an order can be created from either
/// side of the reconciliation (booking-first or payment-first) and filled in as the other side's events arrive.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub product_id: Option<i64>,
    pub price: Option<Euros>,
    pub status: OrderStatus,
    pub customer_email: Option<String>,
    pub reservation_id: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub display_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub product_id: Option<i64>,
    pub price: Option<Euros>,
    pub status: OrderStatus,
    pub customer_email: Option<String>,
    pub reservation_id: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub display_handle: Option<String>,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::AwaitingPayment
    }
}

//--------------------------------------      OrderPatch     ---------------------------------------------------------
/// A partial update against an existing order. Only fields that are `Some` are written; absent fields leave the
/// stored value untouched, which is what protects staff-entered data from stale checkout metadata.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub product_id: Option<i64>,
    pub price: Option<Euros>,
    pub customer_email: Option<String>,
    pub reservation_id: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub display_handle: Option<String>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.product_id.is_none()
            && self.price.is_none()
            && self.customer_email.is_none()
            && self.reservation_id.is_none()
            && self.start_at.is_none()
            && self.end_at.is_none()
            && self.note.is_none()
            && self.display_handle.is_none()
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// One row in the append-only payment ledger.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// The order this payment settles. Nullable: if the order-side write failed, the ledger entry is still recorded.
    pub order_id: Option<i64>,
    pub provider_payment_ref: String,
    pub amount: Euros,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub session_ref: Option<String>,
}

/// The ledger status written for every completed checkout-session event.
pub const PAYMENT_STATUS_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: Option<i64>,
    pub provider_payment_ref: String,
    pub amount: Euros,
    pub status: String,
    pub session_ref: Option<String>,
}

impl NewPayment {
    pub fn succeeded(order_id: Option<i64>, provider_payment_ref: String, amount: Euros, session_ref: String) -> Self {
        Self {
            order_id,
            provider_payment_ref,
            amount,
            status: PAYMENT_STATUS_SUCCEEDED.to_string(),
            session_ref: Some(session_ref),
        }
    }
}
