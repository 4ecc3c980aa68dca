use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment},
    traits::ReconciliationError,
};

/// Appends a row to the payment ledger. The ledger is append-only and deliberately not deduplicated: a redelivered
/// completion event produces a second row carrying the same session reference.
pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, ReconciliationError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                order_id,
                provider_payment_ref,
                amount,
                status,
                session_ref
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.provider_payment_ref)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(payment.session_ref)
    // Stepped to completion (not `fetch_one`) so the implicit transaction commits before returning;
    // see `orders::insert_order`.
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("📝️ Payment {} recorded against order {:?}", payment.id, payment.order_id);
    Ok(payment)
}

/// All ledger rows carrying the given session reference, oldest first. Used by tests and reporting; the handlers
/// never read the ledger back.
pub async fn fetch_payments_for_session(
    session_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE session_ref = $1 ORDER BY id ASC")
        .bind(session_ref)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}
