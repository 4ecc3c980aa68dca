use brg_common::Secret;
use log::*;

pub const DEFAULT_API_URL: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Base URL for the Stripe REST API. Only overridden in tests.
    pub api_url: String,
    /// The secret API key (`sk_live_...` / `sk_test_...`).
    pub secret_key: Secret<String>,
    /// The signing secret for webhook deliveries (`whsec_...`). May be left unset, in which case every webhook
    /// delivery is rejected.
    pub webhook_secret: Secret<String>,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), secret_key: Secret::default(), webhook_secret: Secret::default() }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("BRG_STRIPE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let secret_key = Secret::new(std::env::var("BRG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("BRG_STRIPE_SECRET_KEY not set. Checkout-session creation will fail.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("BRG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("BRG_STRIPE_WEBHOOK_SECRET not set. All payment webhook deliveries will be rejected.");
            String::default()
        }));
        Self { api_url, secret_key, webhook_secret }
    }
}
