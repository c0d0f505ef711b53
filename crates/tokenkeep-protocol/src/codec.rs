//! Token codec: reads the claims embedded in a bearer token.
//!
//! An access token is a JWT: three base64url segments joined by dots,
//! `header.payload.signature`. The payload segment is a JSON object
//! carrying the subject and the expiry. [`decode`] extracts it.
//!
//! The signature segment is never checked. Verifying it needs the
//! server's key, and the server rejects a forged token on first use
//! anyway, so the client only needs the claims to decide when to refresh.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::{Claims, DecodeError};

/// Decodes a token's claims. Pure: no I/O, no clock, no signature check.
///
/// # Errors
/// Returns [`DecodeError::Malformed`] when the token is not three
/// dot-separated segments, the payload is not base64url, or the decoded
/// payload is not a JSON object with a numeric `exp`.
///
/// # Example
///
/// ```rust
/// use tokenkeep_protocol::{decode, DecodeError};
///
/// assert!(matches!(decode("not-a-token"), Err(DecodeError::Malformed(_))));
/// ```
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed(
            "expected three dot-separated segments".into(),
        ));
    };

    if payload.is_empty() {
        return Err(DecodeError::Malformed("empty payload segment".into()));
    }

    // Some issuers keep the `=` padding; the no-pad engine rejects it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DecodeError::Malformed(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| DecodeError::Malformed(format!("unreadable claims: {e}")))
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// This is the `now` that expiry checks compare against. A clock set
/// before 1970 reads as 0.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
