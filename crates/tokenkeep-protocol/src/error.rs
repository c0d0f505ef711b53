//! Error types for the protocol layer.
//!
//! Decoding and validation fail for different reasons and are handled by
//! different callers, so each gets its own enum.

/// Errors produced while reading a token's claims.
///
/// The session layer treats every variant the same way (the token is
/// discarded), but the reason is kept so the UI can show a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The token is not a structurally valid `header.payload.signature`
    /// string, or its payload cannot be read as claims.
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// A credential form value that breaks one of the submission rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("invalid email address")]
    InvalidEmail,
}
