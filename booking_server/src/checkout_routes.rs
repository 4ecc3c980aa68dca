//----------------------------------------------   Checkout  ---------------------------------------------------------

use actix_web::{post, web, HttpResponse};
use brg_common::{Euros, CURRENCY_CODE_LOWER};
use log::{debug, error, info, warn};
use serde_json::json;
use stripe_tools::{NewCheckoutSession, StripeApi};

use crate::{data_objects::CheckoutRequest, errors::ServerError, integrations::stripe::SessionMetadata};

#[post("/session")]
pub async fn create_checkout_session(
    body: web::Json<CheckoutRequest>,
    stripe: web::Data<StripeApi>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    // Fractional amounts are rounded to whole euros; the storefront quotes whole euros anyway.
    let amount = request.amount_euros.unwrap_or(0.0).round().max(0.0) as i64;
    let (Some(product_name), Some(success_url), Some(cancel_url)) =
        (request.product_name.clone(), request.success_url.clone(), request.cancel_url.clone())
    else {
        warn!("🛒️ Checkout request is missing required fields. Rejecting.");
        return Err(ServerError::MissingFields);
    };
    if amount == 0 {
        warn!("🛒️ Checkout request with a zero amount. Rejecting.");
        return Err(ServerError::MissingFields);
    }
    if !success_url.contains("{CHECKOUT_SESSION_ID}") {
        // The completion page needs the session id to poll payment status; without the placeholder it cannot.
        warn!("🛒️ success_url does not contain the {{CHECKOUT_SESSION_ID}} placeholder: {success_url}");
    }
    let price = Euros::from(amount);
    let metadata = SessionMetadata {
        order_id: request.order_id,
        product_id: request.product_id,
        price: Some(price),
        reservation_id: request.reservation_id.clone(),
        display_handle: request.display_handle.clone(),
        note: request.note.clone(),
        customer_email: request.email.clone(),
        start_at: request.start_at.as_deref().and_then(parse_rfc3339),
        end_at: request.end_at.as_deref().and_then(parse_rfc3339),
    };
    debug!("🛒️ Creating checkout session for '{product_name}' at {price}");
    let new_session = NewCheckoutSession {
        product_name,
        unit_amount: price.to_cents(),
        currency: CURRENCY_CODE_LOWER.to_string(),
        success_url,
        cancel_url,
        customer_email: request.email,
        metadata: metadata.to_map(),
    };
    let session = stripe.create_checkout_session(&new_session).await.map_err(|e| {
        error!("🛒️ The payment provider rejected the session request. {e}");
        ServerError::PaymentProviderError(e.to_string())
    })?;
    let url = session.url.ok_or_else(|| {
        error!("🛒️ Session {} was created without a redirect URL", session.id);
        ServerError::PaymentProviderError("no redirect URL on created session".to_string())
    })?;
    info!("🛒️ Checkout session {} created", session.id);
    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

fn parse_rfc3339(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&chrono::Utc))
}
