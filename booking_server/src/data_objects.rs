use serde::Deserialize;

/// The browser-facing checkout request. Field names are camelCase because the storefront widget posts them that
/// way. Everything is optional at the serde level; validation happens in the handler so that missing required
/// fields produce a single uniform 400 rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    pub product_name: Option<String>,
    /// Price in whole euros. Fractional values are rounded to the nearest euro.
    pub amount_euros: Option<f64>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub email: Option<String>,
    /// Existing order to attach the payment to, when the storefront created one before checkout.
    pub order_id: Option<i64>,
    pub product_id: Option<i64>,
    pub reservation_id: Option<String>,
    /// Staff-entered customer handle, carried through session metadata so the paid order keeps it.
    pub display_handle: Option<String>,
    pub note: Option<String>,
    /// Appointment window, RFC 3339. Forwarded through session metadata.
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}
