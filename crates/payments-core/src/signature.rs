//! Stripe Webhook Signatures
//!
//! Stripe signs each delivery with `Stripe-Signature: t=<unix>,v1=<hex>`, where
//! the `v1` value is `HMAC-SHA256(secret, "<t>.<raw body>")`. Verification
//! must run over the body bytes exactly as received.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Replay window used by Stripe's own SDKs
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Signature verification failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no signature header was provided")]
    Missing,

    #[error("malformed signature header: {0}")]
    Malformed(&'static str),

    #[error("no signature matches the expected signature for the payload")]
    Mismatch,

    #[error("timestamp {timestamp} is outside the tolerance window")]
    Expired { timestamp: i64 },

    #[error("secret cannot be used as an HMAC key")]
    InvalidSecret,
}

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    /// `t` exactly as sent; it is part of the signed payload
    pub raw_timestamp: &'a str,
    pub timestamp: i64,
    /// All `v1` entries (Stripe sends several while a secret is being rolled)
    pub signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    pub fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut raw_timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => raw_timestamp = Some(value),
                    "v1" => signatures.push(value),
                    _ => {}
                }
            }
        }

        let raw_timestamp = raw_timestamp.ok_or(SignatureError::Malformed("missing timestamp"))?;
        let timestamp = raw_timestamp
            .parse()
            .map_err(|_| SignatureError::Malformed("timestamp is not an integer"))?;

        if signatures.is_empty() {
            return Err(SignatureError::Malformed("no v1 signature"));
        }

        Ok(Self {
            raw_timestamp,
            timestamp,
            signatures,
        })
    }
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Compute the hex `v1` signature for a payload
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = signed_mac(secret, &timestamp.to_string(), payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a complete header value, as Stripe would send it
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    Ok(format!("t={},v1={}", timestamp, sign(secret, timestamp, payload)?))
}

/// Verify a delivery against the wall clock
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    verify_at(payload, header, secret, tolerance, chrono::Utc::now().timestamp())
}

/// Verify a delivery as of `now` (unix seconds)
///
/// A zero `tolerance` disables the replay check.
pub fn verify_at(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let parsed = SignatureHeader::parse(header)?;
    let mac = signed_mac(secret, parsed.raw_timestamp, payload)?;

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let window = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if window > 0 && now.saturating_sub(parsed.timestamp) > window {
        return Err(SignatureError::Expired {
            timestamp: parsed.timestamp,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"charge.succeeded"}"#;

    fn header_for(payload: &[u8], secret: &str) -> String {
        signature_header(secret, NOW, payload).unwrap()
    }

    #[test]
    fn test_parse_header() {
        let parsed = SignatureHeader::parse("t=123,v1=abc,v0=old,v1=def").unwrap();
        assert_eq!(parsed.timestamp, 123);
        assert_eq!(parsed.raw_timestamp, "123");
        assert_eq!(parsed.signatures, vec!["abc", "def"]);
    }

    #[test]
    fn test_parse_header_rejects_missing_parts() {
        assert_eq!(
            SignatureHeader::parse("v1=abc"),
            Err(SignatureError::Malformed("missing timestamp"))
        );
        assert_eq!(
            SignatureHeader::parse("t=123"),
            Err(SignatureError::Malformed("no v1 signature"))
        );
        assert_eq!(
            SignatureHeader::parse("t=soon,v1=abc"),
            Err(SignatureError::Malformed("timestamp is not an integer"))
        );
        assert!(SignatureHeader::parse("").is_err());
    }

    #[test]
    fn test_valid_signature() {
        let header = header_for(PAYLOAD, SECRET);
        assert_eq!(
            verify_at(PAYLOAD, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let header = header_for(PAYLOAD, SECRET);
        for i in 0..PAYLOAD.len() {
            let mut mutated = PAYLOAD.to_vec();
            mutated[i] ^= 0x01;
            assert_eq!(
                verify_at(&mutated, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW),
                Err(SignatureError::Mismatch),
                "byte {i} flipped but signature still verified"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let header = header_for(PAYLOAD, "whsec_someone_else");
        assert_eq!(
            verify_at(PAYLOAD, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_reformatted_json_fails() {
        let header = header_for(PAYLOAD, SECRET);
        let reparsed: serde_json::Value = serde_json::from_slice(PAYLOAD).unwrap();
        let pretty = serde_json::to_vec_pretty(&reparsed).unwrap();
        assert_eq!(
            verify_at(&pretty, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            verify_at(PAYLOAD, None, SECRET, DEFAULT_TOLERANCE, NOW),
            Err(SignatureError::Missing)
        );
    }

    #[test]
    fn test_non_utf8_payload_is_signed_as_bytes() {
        let payload = [0xff, 0xfe, 0x00, 0x7b];
        let header = header_for(&payload, SECRET);
        assert!(verify_at(&payload, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let good = sign(SECRET, NOW, PAYLOAD).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1=not-hex,v1={good}");
        assert!(verify_at(PAYLOAD, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = header_for(PAYLOAD, SECRET);
        let later = NOW + 301;
        assert_eq!(
            verify_at(PAYLOAD, Some(&header), SECRET, DEFAULT_TOLERANCE, later),
            Err(SignatureError::Expired { timestamp: NOW })
        );
        // Exactly at the edge is still accepted
        assert!(verify_at(PAYLOAD, Some(&header), SECRET, DEFAULT_TOLERANCE, NOW + 300).is_ok());
    }

    #[test]
    fn test_zero_tolerance_disables_replay_check() {
        let header = header_for(PAYLOAD, SECRET);
        assert!(verify_at(PAYLOAD, Some(&header), SECRET, Duration::ZERO, NOW + 86_400).is_ok());
    }
}
