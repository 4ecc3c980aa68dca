use brg_common::Euros;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewOrder, NewPayment, Order, OrderPatch, OrderStatus, Payment};

/// The store operations the reconciliation flows need. Implemented by [`crate::SqliteDatabase`].
///
/// All reads used for matching are snapshot queries: the caller gets a `Vec<Order>` of candidates and applies the
/// pure matchers from [`crate::matching`] to it. There is deliberately no transaction wrapping a snapshot and the
/// write that follows it; see the module docs on [`crate::matching`] for the consistency model.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, ReconciliationError>;

    /// The most recent order carrying the given scheduling-provider reservation id.
    async fn fetch_order_by_reservation_id(&self, reservation_id: &str) -> Result<Option<Order>, ReconciliationError>;

    /// Snapshot of orders that could match a booking event: any order with the given reservation id or customer
    /// email. Returns an empty list when neither fact is present.
    async fn fetch_booking_candidates(
        &self,
        reservation_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<Order>, ReconciliationError>;

    /// Snapshot of orders that could match a payment event: any order with the given customer email or product
    /// reference. Returns an empty list when neither fact is present.
    async fn fetch_payment_candidates(
        &self,
        email: Option<&str>,
        product_id: Option<i64>,
    ) -> Result<Vec<Order>, ReconciliationError>;

    async fn insert_order(&self, order: NewOrder) -> Result<Order, ReconciliationError>;

    /// Apply a partial update to the order with the given id. Returns `None` when no row matched, which callers
    /// treat according to the stale-reference policy (an error for explicit metadata ids).
    async fn update_order(&self, id: i64, patch: OrderPatch) -> Result<Option<Order>, ReconciliationError>;

    /// Update only the scheduled window of the order carrying the reservation id. `None` when no row matched;
    /// reschedules for unknown reservations are silent no-ops at the handler level.
    async fn update_schedule(
        &self,
        reservation_id: &str,
        start_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, ReconciliationError>;

    async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, ReconciliationError>;

    /// List price for a product, used as the third leg of price resolution.
    async fn fetch_product_price(&self, product_id: i64) -> Result<Option<Euros>, ReconciliationError>;

    /// Append a row to the payment ledger. Never deduplicated: redelivered completion events produce multiple rows.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Internal database engine error: {0}")]
    DatabaseError(String),
    #[error("The referenced order (id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
