//! Local token validation.
//!
//! Checks that a token is shaped like a signed-claims (JWT) token and that
//! its expiration claim is still in the future. This is an optimistic
//! liveness check only: no network call, no signature verification. Genuine
//! trust is established server-side on every request.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Number of dot-separated segments in a well-formed token (header.payload.signature)
const TOKEN_SEGMENTS: usize = 3;

/// Name of the expiration claim in the token payload (Unix seconds)
const EXPIRY_CLAIM: &str = "exp";

/// Why a token failed validation.
///
/// All reasons collapse to the same gate behavior (clear + redirect); they
/// are distinguished only for diagnostics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("no token present")]
    Absent,

    #[error("token is not a well-formed claims token")]
    Malformed,

    #[error("token expiration is in the past")]
    Expired,
}

/// Outcome of a single validation call. Produced fresh per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(InvalidReason),
}

/// Check whether `token` is structurally well-formed and unexpired at `now`.
///
/// Deterministic and side-effect-free. Every internal failure maps to
/// `Invalid(Malformed)` rather than panicking or propagating, so the gate
/// can never crash into a state that exposes protected content.
pub fn validate(token: Option<&str>, now: DateTime<Utc>) -> ValidationOutcome {
    let Some(token) = token else {
        return ValidationOutcome::Invalid(InvalidReason::Absent);
    };

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != TOKEN_SEGMENTS || segments.iter().any(|s| s.is_empty()) {
        return ValidationOutcome::Invalid(InvalidReason::Malformed);
    }

    let Some(expires_at) = decode_expiry(segments[1]) else {
        return ValidationOutcome::Invalid(InvalidReason::Malformed);
    };

    if expires_at <= now.timestamp() as f64 {
        ValidationOutcome::Invalid(InvalidReason::Expired)
    } else {
        ValidationOutcome::Valid
    }
}

/// Extract the expiration claim from the payload segment.
///
/// Returns `None` unless the segment decodes as unpadded URL-safe base64
/// into JSON carrying a numeric `exp` claim.
fn decode_expiry(payload: &str) -> Option<f64> {
    let bytes = BASE64_URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get(EXPIRY_CLAIM)?.as_f64()
}
