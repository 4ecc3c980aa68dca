//----------------------------------------   Payment webhook  --------------------------------------------------------

use actix_web::{error::ResponseError, web, HttpRequest, HttpResponse};
use booking_engine::{traits::ReconciliationDatabase, ReconciliationApi};
use log::{debug, error, info, trace, warn};
use stripe_tools::{StripeApi, CHECKOUT_SESSION_COMPLETED};

use crate::{errors::ServerError, integrations::stripe::payment_facts_from_session, route};

route!(stripe_webhook => Post "/webhook/stripe" impl ReconciliationDatabase);
/// Checkout-completion events from the payment provider. The signature check happens in the handler (rather than
/// in middleware) because the provider's scheme signs `"{timestamp}.{body}"`, not the bare body.
pub async fn stripe_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
    stripe: web::Data<StripeApi>,
) -> HttpResponse
where
    B: ReconciliationDatabase,
{
    trace!("💳️ Received payment webhook request: {}", req.uri());
    let Some(signature) = req.headers().get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        warn!("💳️ Webhook delivery without a stripe-signature header. Rejecting.");
        return HttpResponse::BadRequest().body("Missing signature");
    };
    if stripe.webhook_secret_is_unset() {
        error!("💳️ No webhook signing secret is configured. Deliveries cannot be verified and are rejected.");
        return HttpResponse::BadRequest().body("Missing signature");
    }
    let event = match stripe.construct_event(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!("💳️ Webhook signature verification failed. {e}");
            return HttpResponse::BadRequest().body(format!("Webhook Error: {e}"));
        },
    };
    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        debug!("💳️ Ignoring event {} of type {}", event.id, event.event_type);
        return HttpResponse::Ok().body("ignored");
    }
    let session = match event.checkout_session() {
        Ok(session) => session,
        Err(e) => {
            warn!("💳️ Event {} does not carry a checkout session. {e}", event.id);
            return HttpResponse::BadRequest().body("bad json");
        },
    };
    debug!("💳️ Checkout session {} completed", session.id);
    let facts = payment_facts_from_session(&session);
    match api.process_payment(facts).await {
        Ok(outcome) => {
            match outcome.order_id {
                Some(id) => info!("💳️ Payment {} settled against order #{id}", outcome.payment.provider_payment_ref),
                None => warn!(
                    "💳️ Payment {} recorded without an order. Manual reconciliation needed.",
                    outcome.payment.provider_payment_ref
                ),
            }
            HttpResponse::Ok().body("ok")
        },
        Err(e) => {
            error!("💳️ Could not process payment for session {}. {e}", session.id);
            ServerError::BackendError(e.to_string()).error_response()
        },
    }
}
