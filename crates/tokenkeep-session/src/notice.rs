//! One-shot messages the session publishes alongside projection updates.
//!
//! The projection says what IS. A notice says what just HAPPENED, for
//! consumers that react once: the router moves into the authenticated
//! area, a form shows "bad credentials", a toast says "account created".

use tokenkeep_gateway::GatewayError;
use tokenkeep_protocol::{DecodeError, Identity};

use crate::SessionError;

/// Why a session (or a session about to be restored) was thrown away.
///
/// The machine treats all of these the same way (clear the store, go to
/// LoggedOut). The reason only exists so the UI can tell them apart.
/// An expired token and a tampered one are NOT distinguished here; both
/// end up as whatever the server or the decoder reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// A stored or freshly issued access token could not be decoded.
    Malformed(DecodeError),
    /// The access token expired and there was no refresh token.
    NoRefreshToken,
    /// The refresh exchange was rejected or never answered.
    RefreshFailed(GatewayError),
}

impl From<DiscardReason> for SessionError {
    fn from(reason: DiscardReason) -> Self {
        match reason {
            DiscardReason::Malformed(e) => Self::Decode(e),
            DiscardReason::NoRefreshToken => Self::NoRefreshToken,
            DiscardReason::RefreshFailed(e) => Self::Gateway(e),
        }
    }
}

/// Something that just happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The session just became Authenticated. Routing moves the user into
    /// the authenticated area. Published once per transition.
    NavigateToAuthenticated(Identity),

    /// The server refused the login (or couldn't be reached).
    LoginFailed(GatewayError),

    /// The account was created. The user still has to log in.
    SignupSucceeded,

    /// The server refused the signup (or couldn't be reached).
    SignupFailed(GatewayError),

    /// The session was forcibly ended.
    SessionDiscarded(DiscardReason),
}

impl Notice {
    /// The error this notice reports, if it reports one.
    pub fn as_error(&self) -> Option<SessionError> {
        match self {
            Self::LoginFailed(e) | Self::SignupFailed(e) => {
                Some(SessionError::Gateway(e.clone()))
            }
            Self::SessionDiscarded(reason) => Some(reason.clone().into()),
            Self::NavigateToAuthenticated(_) | Self::SignupSucceeded => None,
        }
    }
}
