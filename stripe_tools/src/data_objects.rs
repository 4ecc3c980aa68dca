use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only event type the gateway acts on. Everything else is acknowledged and ignored.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

//--------------------------------------        Event        ---------------------------------------------------------
/// A webhook event delivery. `data.object` is kept as raw JSON until the event type has been inspected; only
/// checkout sessions are ever deserialized further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl Event {
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

//--------------------------------------   CheckoutSession   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// The hosted redirect URL. Present on freshly created sessions, usually absent in webhook deliveries.
    #[serde(default)]
    pub url: Option<String>,
    /// Session total in minor currency units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// The payment-intent reference. Delivered as a bare id string unless the caller asked for expansion.
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSession {
    /// The payer's email: the session-level customer details win over the secondary `customer_email` field.
    pub fn payer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .filter(|e| !e.is_empty())
    }
}

//--------------------------------------  NewCheckoutSession  --------------------------------------------------------
/// Everything needed to create a hosted checkout session for a single line item.
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub product_name: String,
    /// Line-item price in minor currency units.
    pub unit_amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    /// The reconciliation metadata bag, echoed back verbatim on the completion webhook.
    pub metadata: HashMap<String, String>,
}

impl NewCheckoutSession {
    /// The form-encoded body for `POST /v1/checkout/sessions`. Stripe's REST API takes `application/x-www-form-
    /// urlencoded` with bracketed array/dictionary keys rather than JSON.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price_data][currency]".to_string(), self.currency.clone()),
            ("line_items[0][price_data][unit_amount]".to_string(), self.unit_amount.to_string()),
            ("line_items[0][price_data][product_data][name]".to_string(), self.product_name.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        for key in keys {
            form.push((format!("metadata[{key}]"), self.metadata[key].clone()));
        }
        form
    }
}
