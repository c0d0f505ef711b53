//! Session types: the state the machine owns and the view it publishes.
//!
//! - [`SessionState`] is the single source of truth. Only the
//!   [`SessionMachine`](crate::SessionMachine) writes it.
//! - [`SessionProjection`] is what everyone else reads. It is derived
//!   from the state by [`SessionProjection::of`] and has no other way
//!   to change.

use std::fmt;

use tokenkeep_protocol::{Identity, TokenPair};

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// Identifies one outstanding network request issued by the machine.
///
/// When the request completes, its completion event carries the ticket
/// back. The machine only accepts a completion whose ticket is still the
/// outstanding one; anything else belongs to a request the session has
/// already moved past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Which form is waiting on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Login,
    Signup,
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Signup => write!(f, "signup"),
        }
    }
}

/// The state of the client's session. Exactly one variant holds at a time.
///
/// ```text
/// LoggedOut ── startup, token valid ──────────────→ Authenticated
/// LoggedOut ── startup, expired + refresh token ──→ Refreshing
/// Authenticated ── refresh requested ─────────────→ Refreshing
/// Refreshing ── exchange ok ──→ Authenticated
/// Refreshing ── exchange failed ──→ LoggedOut
/// LoggedOut ── login / signup ──→ SubmissionInFlight
/// SubmissionInFlight ── login ok ──→ Authenticated
/// SubmissionInFlight ── failed, or signup done ──→ LoggedOut
/// any ── logout ──→ LoggedOut
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session. The initial state.
    LoggedOut,

    /// A decoded, adopted access token.
    ///
    /// `refresh` is `None` only when a still-valid access token was found
    /// in storage without its refresh token; such a session ends when the
    /// access token expires.
    Authenticated {
        identity: Identity,
        access: String,
        refresh: Option<String>,
    },

    /// The access token expired and its refresh token is being exchanged.
    Refreshing { stale: TokenPair },

    /// A login or signup form was submitted and is waiting on the server.
    SubmissionInFlight(SubmissionKind),
}

impl SessionState {
    /// Returns `true` if a session is established.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "LoggedOut"),
            Self::Authenticated { .. } => write!(f, "Authenticated"),
            Self::Refreshing { .. } => write!(f, "Refreshing"),
            Self::SubmissionInFlight(kind) => write!(f, "SubmissionInFlight({kind})"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionProjection
// ---------------------------------------------------------------------------

/// The read-only view of the session handed to UI and routing code.
///
/// Recomputed from [`SessionState`] after every transition. Holds no
/// tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProjection {
    /// The signed-in user, or `None` when there is no session.
    pub identity: Option<Identity>,
    pub is_authenticated: bool,
    /// `true` while a login or signup form is waiting on the server.
    pub is_submitting: bool,
}

impl SessionProjection {
    /// Projects a state. Pure.
    pub fn of(state: &SessionState) -> Self {
        match state {
            SessionState::Authenticated { identity, .. } => Self {
                identity: Some(identity.clone()),
                is_authenticated: true,
                is_submitting: false,
            },
            SessionState::SubmissionInFlight(_) => Self {
                identity: None,
                is_authenticated: false,
                is_submitting: true,
            },
            SessionState::LoggedOut | SessionState::Refreshing { .. } => Self::default(),
        }
    }

    /// The username, or `""` with no session.
    pub fn username(&self) -> &str {
        self.identity.as_ref().map_or("", |i| i.username.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Identity {
        Identity {
            username: "ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn test_projection_of_logged_out_is_empty() {
        let p = SessionProjection::of(&SessionState::LoggedOut);
        assert_eq!(p, SessionProjection::default());
        assert_eq!(p.username(), "");
    }

    #[test]
    fn test_projection_of_authenticated_exposes_identity_only() {
        let state = SessionState::Authenticated {
            identity: ada(),
            access: "A1".into(),
            refresh: Some("R1".into()),
        };

        let p = SessionProjection::of(&state);

        assert!(p.is_authenticated);
        assert!(!p.is_submitting);
        assert_eq!(p.identity, Some(ada()));
        assert_eq!(p.username(), "ada");
    }

    #[test]
    fn test_projection_of_refreshing_is_not_authenticated() {
        let state = SessionState::Refreshing {
            stale: TokenPair::new("A1", "R1"),
        };

        let p = SessionProjection::of(&state);

        assert!(!p.is_authenticated);
        assert!(!p.is_submitting);
        assert_eq!(p.identity, None);
    }

    #[test]
    fn test_projection_of_submission_is_submitting() {
        for kind in [SubmissionKind::Login, SubmissionKind::Signup] {
            let p = SessionProjection::of(&SessionState::SubmissionInFlight(kind));
            assert!(p.is_submitting);
            assert!(!p.is_authenticated);
        }
    }

    #[test]
    fn test_state_display_never_shows_tokens() {
        let state = SessionState::Authenticated {
            identity: ada(),
            access: "secret-access".into(),
            refresh: Some("secret-refresh".into()),
        };
        assert_eq!(state.to_string(), "Authenticated");
        assert_eq!(
            SessionState::SubmissionInFlight(SubmissionKind::Signup).to_string(),
            "SubmissionInFlight(signup)"
        );
    }

    #[test]
    fn test_ticket_display() {
        assert_eq!(Ticket(3).to_string(), "req-3");
    }
}
