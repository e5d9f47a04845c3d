//! Stripe webhook signature verification
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The signed payload is `"{t}.{raw body}"`, keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> AppResult<ParsedHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    AppError::InvalidSignature("Invalid timestamp in header".to_string())
                })?);
            }
            // Undecodable entries are skipped like unknown schemes
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::InvalidSignature("No timestamp in header".to_string()))?;
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature(
            "No v1 signatures in header".to_string(),
        ));
    }

    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify a signed webhook payload.
///
/// `tolerance_seconds` of zero disables the timestamp check. Returns the
/// signed timestamp on success.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: i64,
) -> AppResult<i64> {
    let parsed = parse_header(header)?;

    if tolerance_seconds > 0 && now.abs_diff(parsed.timestamp) > tolerance_seconds {
        return Err(AppError::InvalidSignature(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    let mac = mac_for(secret, parsed.timestamp, payload)?;
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

    if !matched {
        return Err(AppError::InvalidSignature(
            "No signatures found matching the expected signature".to_string(),
        ));
    }

    Ok(parsed.timestamp)
}

/// Build a valid signature header for a payload
#[cfg(any(test, feature = "test-utils"))]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = mac_for(secret, timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}
