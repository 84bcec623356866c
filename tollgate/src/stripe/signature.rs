//! Stripe webhook signature scheme
//!
//! Header: `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! Signed payload: `"<t>.<raw body>"`, HMAC-SHA256 with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,
    #[error("malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("no v1 signature matches the payload")]
    Mismatch,
    #[error("signature timestamp outside tolerance")]
    TimestampOutsideTolerance,
    #[error("webhook secret rejected by HMAC")]
    InvalidSecret,
}

/// Verify `payload` against a `Stripe-Signature` header value.
///
/// Any `v1` entry may match, so both secrets verify during rotation.
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = signed_mac(timestamp, payload, secret)?;
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    Ok(())
}

/// Build a header value the verifier accepts
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let ts = timestamp.to_string();
    let digest = signed_mac(&ts, payload, secret)?.finalize().into_bytes();
    Ok(format!("t={ts},v1={}", hex::encode(digest)))
}

fn signed_mac(timestamp: &str, payload: &[u8], secret: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
