//! `SqliteDatabase` is a concrete implementation of a booking reconciliation backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`ReconciliationDatabase`] trait by delegating
//! to the low-level query functions in [`super::db`].
use std::fmt::Debug;

use brg_common::Euros;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{new_pool, orders, payments, products};
use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderPatch, OrderStatus, Payment},
    traits::{ReconciliationDatabase, ReconciliationError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object with a connection pool of size `max_connections`.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, ReconciliationError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_reservation_id(&self, reservation_id: &str) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reservation_id(reservation_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_booking_candidates(
        &self,
        reservation_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = orders::fetch_booking_candidates(reservation_id, email, &mut conn).await?;
        Ok(candidates)
    }

    async fn fetch_payment_candidates(
        &self,
        email: Option<&str>,
        product_id: Option<i64>,
    ) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = orders::fetch_payment_candidates(email, product_id, &mut conn).await?;
        Ok(candidates)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn update_order(&self, id: i64, patch: OrderPatch) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(id, patch, &mut conn).await
    }

    async fn update_schedule(
        &self,
        reservation_id: &str,
        start_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_schedule(reservation_id, start_at, end_at, &mut conn).await
    }

    async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_order_status(id, status, &mut conn).await
    }

    async fn fetch_product_price(&self, product_id: i64) -> Result<Option<Euros>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let price = products::fetch_product_price(product_id, &mut conn).await?;
        Ok(price)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}
