use brg_common::Euros;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderPatch, OrderStatus, Payment},
    matching::{resolve_price, select_booking_match, select_payment_match, BookingFacts, PaymentFacts},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// The orchestration layer over a [`ReconciliationDatabase`] backend. One instance is shared by all request
/// handlers; every method is a single reconciliation flow for one webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconciliationApi<B> {
    db: B,
}

#[derive(Debug, Clone)]
pub enum BookingOutcome {
    /// An existing order was matched and patched. `rule` names the precedence rule that matched.
    Updated { order: Order, rule: &'static str },
    /// No order matched; a fresh awaiting-payment order was inserted.
    Created(Order),
}

#[derive(Debug, Clone)]
pub enum CancellationOutcome {
    Cancelled(Order),
    /// The order is already paid. Paid orders are never auto-cancelled.
    AlreadyPaid(Order),
    /// No order carries this reservation id. Not an error: the provider may cancel bookings we never saw.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The order the payment settled against, if one could be matched or created.
    pub order_id: Option<i64>,
    pub payment: Payment,
}

impl<B: ReconciliationDatabase> ReconciliationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Handle a `created` booking event: match an existing order under the booking precedence and patch it into
    /// awaiting-payment with the event's facts, or insert a fresh order when nothing matches.
    pub async fn process_booking_created(&self, facts: BookingFacts) -> Result<BookingOutcome, ReconciliationError> {
        let candidates =
            self.db.fetch_booking_candidates(facts.reservation_id.as_deref(), facts.customer_email.as_deref()).await?;
        let patch = OrderPatch {
            status: Some(OrderStatus::AwaitingPayment),
            customer_email: facts.customer_email.clone(),
            reservation_id: facts.reservation_id.clone(),
            start_at: facts.start_at,
            end_at: facts.end_at,
            ..Default::default()
        };
        match select_booking_match(&facts, &candidates) {
            Some(hit) => {
                debug!("📅️ Booking matched order #{} via {}", hit.order_id, hit.rule);
                // Zero rows updated means the metadata carried a stale order reference. Surfaced, not absorbed.
                let order = self
                    .db
                    .update_order(hit.order_id, patch)
                    .await?
                    .ok_or(ReconciliationError::OrderIdNotFound(hit.order_id))?;
                Ok(BookingOutcome::Updated { order, rule: hit.rule })
            },
            None => {
                let order = self
                    .db
                    .insert_order(NewOrder {
                        product_id: facts.product_id,
                        price: None,
                        status: OrderStatus::AwaitingPayment,
                        customer_email: facts.customer_email,
                        reservation_id: facts.reservation_id,
                        start_at: facts.start_at,
                        end_at: facts.end_at,
                        note: None,
                        display_handle: None,
                    })
                    .await?;
                info!("📅️ No order matched the booking. Created order #{} in awaiting-payment.", order.id);
                Ok(BookingOutcome::Created(order))
            },
        }
    }

    /// Handle a `rescheduled` event: move the scheduled window of the order carrying the reservation id. Returns
    /// `None` when no order carries it, which the handler treats as a silent no-op.
    pub async fn process_booking_rescheduled(
        &self,
        reservation_id: &str,
        start_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, ReconciliationError> {
        let updated = self.db.update_schedule(reservation_id, start_at, end_at).await?;
        match &updated {
            Some(order) => debug!("📅️ Order #{} rescheduled", order.id),
            None => debug!("📅️ Reschedule for unknown reservation {reservation_id} ignored"),
        }
        Ok(updated)
    }

    /// Handle a `cancelled` event. Cancellation is a status change, never a delete, and is refused (silently, to
    /// the provider) once the order is paid.
    pub async fn process_booking_cancelled(
        &self,
        reservation_id: &str,
    ) -> Result<CancellationOutcome, ReconciliationError> {
        let Some(order) = self.db.fetch_order_by_reservation_id(reservation_id).await? else {
            debug!("📅️ Cancellation for unknown reservation {reservation_id} ignored");
            return Ok(CancellationOutcome::NotFound);
        };
        if order.status == OrderStatus::Paid {
            info!("📅️ Order #{} is paid; cancellation from the scheduling provider ignored.", order.id);
            return Ok(CancellationOutcome::AlreadyPaid(order));
        }
        let order = self.db.set_order_status(order.id, OrderStatus::Cancelled).await?;
        info!("📅️ Order #{} cancelled", order.id);
        Ok(CancellationOutcome::Cancelled(order))
    }

    /// Handle a completed checkout session: resolve the order (directly by metadata id, by the payment precedence,
    /// or by creating one already in paid status), mark it paid, and append the ledger entry.
    ///
    /// The ledger write happens even when the order-side write fails; a completed payment must always leave a
    /// trace. Redelivered events produce a second ledger row: there is no deduplication by session reference.
    pub async fn process_payment(&self, facts: PaymentFacts) -> Result<PaymentOutcome, ReconciliationError> {
        let matched = match facts.order_id {
            Some(id) => {
                // An explicit order reference that doesn't resolve is a server error, never a silent duplicate.
                let order = self.db.fetch_order_by_id(id).await?.ok_or(ReconciliationError::OrderIdNotFound(id))?;
                Some((order, "metadata order id"))
            },
            None => {
                let candidates =
                    self.db.fetch_payment_candidates(facts.customer_email.as_deref(), facts.product_id).await?;
                select_payment_match(&facts, &candidates)
                    .and_then(|hit| candidates.into_iter().find(|o| o.id == hit.order_id).map(|o| (o, hit.rule)))
            },
        };

        let order_id = match matched {
            Some((order, rule)) => {
                debug!("💳️ Payment for session {} matched order #{} via {rule}", facts.session_ref, order.id);
                let price = self.resolve_price_for(order.price, &facts, order.product_id.or(facts.product_id)).await;
                let mut patch =
                    OrderPatch { status: Some(OrderStatus::Paid), price: Some(price), ..Default::default() };
                // Staff-entered values are never clobbered by checkout metadata: fill only what is unset.
                if order.display_handle.is_none() {
                    patch.display_handle = facts.display_handle.clone();
                }
                if order.note.is_none() {
                    patch.note = facts.note.clone();
                }
                if order.customer_email.is_none() {
                    patch.customer_email = facts.customer_email.clone();
                }
                match self.db.update_order(order.id, patch).await {
                    Ok(Some(_)) => {},
                    Ok(None) => warn!("💳️ Order #{} vanished while marking it paid", order.id),
                    Err(e) => error!("💳️ Could not mark order #{} as paid. {e}", order.id),
                }
                Some(order.id)
            },
            None => {
                let price = self.resolve_price_for(None, &facts, facts.product_id).await;
                let new_order = NewOrder {
                    product_id: facts.product_id,
                    price: Some(price),
                    status: OrderStatus::Paid,
                    customer_email: facts.customer_email.clone(),
                    reservation_id: facts.reservation_id.clone(),
                    start_at: facts.start_at,
                    end_at: facts.end_at,
                    note: facts.note.clone(),
                    display_handle: facts.display_handle.clone(),
                };
                match self.db.insert_order(new_order).await {
                    Ok(order) => {
                        info!("💳️ Payment arrived before any booking. Created order #{} as paid.", order.id);
                        Some(order.id)
                    },
                    Err(e) => {
                        error!("💳️ Could not create order for session {}. Recording orphan ledger entry. {e}", facts.session_ref);
                        None
                    },
                }
            },
        };

        let payment_ref = facts.payment_ref.clone().unwrap_or_else(|| facts.session_ref.clone());
        let payment = self
            .db
            .insert_payment(NewPayment::succeeded(order_id, payment_ref, facts.amount, facts.session_ref.clone()))
            .await?;
        info!("💳️ Ledger entry {} recorded for session {}", payment.id, facts.session_ref);
        Ok(PaymentOutcome { order_id, payment })
    }

    /// Lazily apply the total price-resolution order. The catalog is only consulted when neither the order nor the
    /// session metadata carries a price, and a catalog lookup failure degrades to the charged amount rather than
    /// aborting the flow.
    async fn resolve_price_for(&self, stored: Option<Euros>, facts: &PaymentFacts, product_id: Option<i64>) -> Euros {
        let catalog = if stored.is_none() && facts.meta_price.is_none() {
            match product_id {
                Some(pid) => match self.db.fetch_product_price(pid).await {
                    Ok(price) => price,
                    Err(e) => {
                        warn!("💳️ Catalog lookup for product {pid} failed; using charged amount. {e}");
                        None
                    },
                },
                None => None,
            }
        } else {
            None
        };
        resolve_price(stored, facts.meta_price, catalog, facts.amount)
    }
}
