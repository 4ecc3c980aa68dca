use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderPatch, OrderStatus},
    traits::ReconciliationError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, ReconciliationError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                product_id,
                price,
                status,
                customer_email,
                reservation_id,
                start_at,
                end_at,
                note,
                display_handle
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.product_id)
    .bind(order.price)
    .bind(order.status)
    .bind(order.customer_email)
    .bind(order.reservation_id)
    .bind(order.start_at)
    .bind(order.end_at)
    .bind(order.note)
    .bind(order.display_handle)
    // RETURNING statements must be stepped to completion before the call returns, or the implicit
    // transaction commits later on the worker thread and other pool connections read stale state.
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("📝️ Order inserted with id {}", order.id);
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the most recent order carrying the given reservation id. At most one order should carry any reservation
/// id; if the invariant is ever violated the highest id wins.
pub async fn fetch_order_by_reservation_id(
    reservation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE reservation_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(reservation_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Snapshot of orders a booking event could match: anything carrying the reservation id or the attendee email.
pub async fn fetch_booking_candidates(
    reservation_id: Option<&str>,
    email: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    fetch_candidates(&[("reservation_id", reservation_id), ("customer_email", email)], None, conn).await
}

/// Snapshot of orders a payment event could match: anything carrying the payer email or the product reference.
pub async fn fetch_payment_candidates(
    email: Option<&str>,
    product_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    fetch_candidates(&[("customer_email", email)], product_id, conn).await
}

async fn fetch_candidates(
    text_fields: &[(&str, Option<&str>)],
    product_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let fields: Vec<(&str, &str)> =
        text_fields.iter().filter_map(|(col, val)| val.map(|v| (*col, v))).collect();
    if fields.is_empty() && product_id.is_none() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE ");
    let mut where_clause = builder.separated(" OR ");
    for (col, val) in fields {
        where_clause.push(format!("{col} = "));
        where_clause.push_bind_unseparated(val.to_string());
    }
    if let Some(pid) = product_id {
        where_clause.push("product_id = ");
        where_clause.push_bind_unseparated(pid);
    }
    builder.push(" ORDER BY id ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Candidate snapshot holds {} orders", orders.len());
    Ok(orders)
}

pub async fn update_order(
    id: i64,
    patch: OrderPatch,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, ReconciliationError> {
    if patch.is_empty() {
        debug!("📝️ No fields to update for order {id}. Update request skipped.");
        return Err(ReconciliationError::OrderModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = patch.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(product_id) = patch.product_id {
        set_clause.push("product_id = ");
        set_clause.push_bind_unseparated(product_id);
    }
    if let Some(price) = patch.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(email) = patch.customer_email {
        set_clause.push("customer_email = ");
        set_clause.push_bind_unseparated(email);
    }
    if let Some(reservation_id) = patch.reservation_id {
        set_clause.push("reservation_id = ");
        set_clause.push_bind_unseparated(reservation_id);
    }
    if let Some(start_at) = patch.start_at {
        set_clause.push("start_at = ");
        set_clause.push_bind_unseparated(start_at);
    }
    if let Some(end_at) = patch.end_at {
        set_clause.push("end_at = ");
        set_clause.push_bind_unseparated(end_at);
    }
    if let Some(note) = patch.note {
        set_clause.push("note = ");
        set_clause.push_bind_unseparated(note);
    }
    if let Some(handle) = patch.display_handle {
        set_clause.push("display_handle = ");
        set_clause.push_bind_unseparated(handle);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let res = builder
        .build()
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .map(|row: SqliteRow| Order::from_row(&row))
        .transpose()?;
    trace!("📝️ Result of update_order: {res:?}");
    Ok(res)
}

/// Moves only the scheduled window for the order carrying the reservation id. Both columns are overwritten with the
/// event's values, including nulls: a reschedule replaces the window wholesale.
pub async fn update_schedule(
    reservation_id: &str,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, ReconciliationError> {
    let order = sqlx::query_as(
        "UPDATE orders SET start_at = $1, end_at = $2, updated_at = CURRENT_TIMESTAMP WHERE reservation_id = $3 \
         RETURNING *",
    )
    .bind(start_at)
    .bind(end_at)
    .bind(reservation_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

pub async fn set_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, ReconciliationError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    result.ok_or(ReconciliationError::OrderIdNotFound(id))
}
