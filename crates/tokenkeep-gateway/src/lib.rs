//! Network operations of the auth API for Tokenkeep.
//!
//! Provides the [`AuthGateway`] trait, which abstracts the three calls a
//! client makes to the auth server, and an HTTP implementation.
//!
//! A gateway only talks to the network. It never reads or writes stored
//! tokens; persisting what it returns is the session layer's job.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpGateway`] via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::GatewayError;
#[cfg(feature = "http")]
pub use http::{HttpGateway, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};

use std::future::Future;

use tokenkeep_protocol::{LoginRequest, RegisterRequest, TokenPair};

/// The auth server, as seen by the client.
///
/// Each call issues exactly one request and reports the outcome. There
/// is no retry and no timeout at this layer.
///
/// # Example
///
/// ```rust
/// use tokenkeep_gateway::{AuthGateway, GatewayError};
/// use tokenkeep_protocol::{LoginRequest, RegisterRequest, TokenPair};
///
/// /// Refuses everything. Handy for exercising logged-out screens.
/// struct Closed;
///
/// impl AuthGateway for Closed {
///     async fn login(&self, _: &LoginRequest) -> Result<TokenPair, GatewayError> {
///         Err(GatewayError::Rejected("closed".into()))
///     }
///     async fn register(&self, _: &RegisterRequest) -> Result<(), GatewayError> {
///         Err(GatewayError::Rejected("closed".into()))
///     }
///     async fn refresh(&self, _: &str) -> Result<TokenPair, GatewayError> {
///         Err(GatewayError::Rejected("closed".into()))
///     }
/// }
/// ```
pub trait AuthGateway: Send + Sync + 'static {
    /// Exchanges a username and password for a token pair.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<TokenPair, GatewayError>> + Send;

    /// Creates an account. Success does NOT log the user in; no tokens
    /// are issued.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Exchanges a refresh token for a fresh pair.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenPair, GatewayError>> + Send;
}
