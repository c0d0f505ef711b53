/// Errors returned by an [`AuthGateway`](crate::AuthGateway) call.
///
/// `Clone` because the session layer forwards these to every subscriber
/// as part of a notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The server answered with a non-success status. Carries the
    /// server's message, or a generic one if the body had none.
    #[error("{0}")]
    Rejected(String),

    /// The request never got an answer (DNS, refused connection, reset).
    #[error("auth server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with success, but the body wasn't what the
    /// endpoint promises (e.g. a refresh response without tokens).
    #[error("invalid response from auth server: {0}")]
    InvalidResponse(String),
}
