//! # Booking reconciliation gateway server
//! This module hosts the HTTP surface of the gateway. It is responsible for:
//! Listening for incoming webhook requests from the scheduling and payment providers.
//! Parsing the (variable-shape) request bodies and extracting the reconciliation facts.
//! Handing the facts to the reconciliation engine, which matches or creates order records.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/cal`: booking lifecycle events from the scheduling provider (HMAC-signed).
//! * `/webhook/stripe`: checkout-completion events from the payment provider (signature-verified).
//! * `/checkout/session`: browser-facing endpoint that creates a hosted payment session and returns the redirect.

pub mod cal_event;
pub mod cal_routes;
pub mod checkout_routes;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod stripe_routes;

#[cfg(test)]
mod endpoint_tests;
