//! Error types for the session layer.

use tokenkeep_gateway::GatewayError;
use tokenkeep_protocol::{DecodeError, ValidationError};

use crate::Ticket;

/// Errors that can occur during session management.
///
/// Some variants reject an event outright (the session is busy, or the
/// event no longer applies) and leave the state untouched. The rest
/// report why an operation ended without a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A refresh was needed but there is no refresh token to use.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// A login or signup is already waiting on the server.
    #[error("a login or signup is already in progress")]
    SubmissionInFlight,

    /// A token refresh is already waiting on the server.
    #[error("a token refresh is already in progress")]
    RefreshInFlight,

    /// The operation needs a session and there is none.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Login/signup was submitted while a session is active.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// A completion arrived for a request the session has moved past
    /// (e.g. the user logged out while it was in flight). It was dropped.
    #[error("request {0} was superseded")]
    Superseded(Ticket),

    /// A token could not be read.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The auth server refused or couldn't be reached.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A credential broke a form rule and was never sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
