//! A minimal Stripe client for the booking gateway.
//!
//! Only the two surfaces the gateway actually touches are implemented: hosted checkout-session creation over the
//! REST API, and webhook signature verification for event deliveries. Everything else Stripe offers is out of scope.
mod api;
mod config;
mod error;
mod webhook;

mod data_objects;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{CheckoutSession, CustomerDetails, Event, NewCheckoutSession, CHECKOUT_SESSION_COMPLETED};
pub use error::StripeApiError;
pub use webhook::{compute_signature, verify_webhook_signature, verify_with_tolerance, SignatureError, DEFAULT_TOLERANCE};
