use thiserror::Error;

use crate::webhook::SignatureError;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The session was created but carries no redirect URL")]
    MissingRedirectUrl,
    #[error("Webhook signature verification failed: {0}")]
    WebhookSignature(#[from] SignatureError),
}
