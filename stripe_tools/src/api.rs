use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSession, Event, NewCheckoutSession},
    webhook::verify_webhook_signature,
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    /// Creates a hosted checkout session and returns it. The caller redirects the customer to `session.url`.
    pub async fn create_checkout_session(
        &self,
        new_session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        let url = self.url("/checkout/sessions");
        trace!("Creating checkout session: {url}");
        let response = self
            .client
            .post(url)
            .form(&new_session.to_form())
            .send()
            .await
            .map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            let session =
                response.json::<CheckoutSession>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))?;
            debug!("Checkout session {} created", session.id);
            Ok(session)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    /// Verifies a webhook delivery against the configured signing secret and returns the event it carries.
    pub fn construct_event(&self, payload: &[u8], signature_header: &str) -> Result<Event, StripeApiError> {
        let event = verify_webhook_signature(payload, signature_header, self.config.webhook_secret.reveal())?;
        Ok(event)
    }

    /// True when no webhook signing secret has been configured. Deliveries cannot be verified in that state.
    pub fn webhook_secret_is_unset(&self) -> bool {
        self.config.webhook_secret.is_unset()
    }
}
