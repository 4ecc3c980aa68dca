//! Webhook signature verification.
//!
//! Stripe signs each delivery with the endpoint's signing secret: the `stripe-signature` header carries a unix
//! timestamp and one or more `v1` signatures, where each signature is HMAC-SHA256 over `"{timestamp}.{raw body}"`.
//! Verification recomputes the digest and additionally bounds the timestamp to defeat replay of captured
//! deliveries.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::data_objects::Event;

/// How old a delivery may be before it is rejected as a replay. Matches the default in Stripe's official SDKs.
pub const DEFAULT_TOLERANCE: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("No webhook signing secret is configured")]
    NoSecretConfigured,
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The signature does not match the payload")]
    BadSignature,
    #[error("The delivery timestamp is outside the accepted tolerance")]
    TimestampOutOfTolerance,
    #[error("The payload is not valid JSON: {0}")]
    BadPayload(String),
}

/// Verify a webhook delivery and deserialize the event it carries.
pub fn verify_webhook_signature(payload: &[u8], header: &str, secret: &str) -> Result<Event, SignatureError> {
    verify_with_tolerance(payload, header, secret, DEFAULT_TOLERANCE)
}

pub fn verify_with_tolerance(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<Event, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecretConfigured);
    }
    let (timestamp, signatures) = parse_signature_header(header)?;
    let age = Utc::now().timestamp() - timestamp;
    if age > tolerance.num_seconds() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let expected = compute_signature(timestamp, payload, secret);
    if !signatures.iter().any(|sig| sig == &expected) {
        return Err(SignatureError::BadSignature);
    }
    serde_json::from_slice(payload).map_err(|e| SignatureError::BadPayload(e.to_string()))
}

/// The hex `v1` signature for a timestamped payload. Public so that tests (and tooling) can construct valid headers.
pub fn compute_signature(timestamp: i64, payload: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex_encode(&mac.finalize().into_bytes())
}

fn parse_signature_header(header: &str) -> Result<(i64, Vec<String>), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader(format!("element without '=': {part}")));
        };
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|e| SignatureError::MalformedHeader(format!("bad timestamp: {e}")))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value.to_string()),
            // Unknown schemes (v0 test-mode signatures etc.) are ignored, per the provider's documentation.
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("no timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader("no v1 signature".to_string()));
    }
    Ok((timestamp, signatures))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
