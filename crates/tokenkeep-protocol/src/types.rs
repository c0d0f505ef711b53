//! Core types exchanged with the auth API.
//!
//! Everything here is plain data: the token pair the server issues, the
//! identity embedded in an access token, and the JSON request bodies for
//! the three auth endpoints.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// An access/refresh token pair as issued by the server.
///
/// Both values are opaque bearer credentials. The access token is
/// short-lived and proves identity on API calls; the refresh token is
/// longer-lived and is only ever exchanged for a new pair.
///
/// A pair is always replaced wholesale. There is no way to update one
/// half in place, which keeps the stored copy and the in-memory copy from
/// drifting apart.
///
/// The JSON shape matches the login and refresh responses:
///
/// ```json
/// { "access": "eyJ...", "refresh": "eyJ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    /// Builds a pair from anything string-like.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity and claims
// ---------------------------------------------------------------------------

/// Who the current user is, as far as the client knows.
///
/// This is the subject part of [`Claims`]. It is what the rest of the
/// application displays (profile menu, greeting, etc.).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.username)
        } else {
            write!(f, "{} <{}>", self.username, self.email)
        }
    }
}

/// The claims carried in an access token's payload.
///
/// Claims are derived, never persisted: they are recomputed from the
/// access token whenever they are needed. They are NOT signature-checked
/// here. The issuing server is the only party that can vouch for them, so
/// a decoded token is trusted only until the server says otherwise.
///
/// Missing or `null` `username`/`email` fields mean "unknown". A missing
/// `exp` makes the whole token malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Absolute expiry, in seconds since the Unix epoch. Fractional
    /// seconds are truncated.
    #[serde(deserialize_with = "whole_seconds")]
    pub exp: u64,
}

fn whole_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = serde_json::Number::deserialize(deserializer)?;
    if let Some(secs) = n.as_u64() {
        return Ok(secs);
    }
    match n.as_f64() {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs.floor() as u64),
        _ => Err(serde::de::Error::custom(format!("invalid expiry: {n}"))),
    }
}

impl Claims {
    /// Returns `true` if the token is still valid at `now` (seconds).
    ///
    /// A token expiring exactly at `now` is still valid. No clock-skew
    /// tolerance is applied.
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.exp >= now
    }

    /// The identity portion of the claims.
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /auth/login/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Passwords stay out of `{:?}` output (and therefore out of logs).
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/token/refresh/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// The error body a non-success response may carry.
///
/// The API reports failures either as `{"message": "..."}` or, in the
/// Django REST style, as `{"detail": "..."}`. Both are optional; an
/// unreadable body is treated as one with neither field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// The server's message, preferring `message` over `detail`.
    pub fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.detail.filter(|d| !d.is_empty()))
    }
}
