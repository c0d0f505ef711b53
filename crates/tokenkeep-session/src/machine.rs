//! The session state machine: a pure transition table.
//!
//! [`SessionMachine::handle`] takes an [`Event`] and the current time and
//! returns the [`Effect`]s the caller must carry out. It does no I/O of
//! its own: no storage, no network, no clock. That keeps every
//! transition testable as a plain function call, and keeps the machine
//! the only writer of [`SessionState`].
//!
//! | State | Event | Guard | Effects | Next |
//! |---|---|---|---|---|
//! | LoggedOut | `Startup` | no access token | - | LoggedOut |
//! | LoggedOut | `Startup` | valid (`exp >= now`) | navigate | Authenticated |
//! | LoggedOut | `Startup` | expired, refresh token | refresh | Refreshing |
//! | LoggedOut | `Startup` | expired, no refresh token | clear, discarded | LoggedOut |
//! | LoggedOut | `Startup` | undecodable | clear, discarded | LoggedOut |
//! | Authenticated | `RefreshRequested` | refresh token | refresh | Refreshing |
//! | Authenticated | `RefreshRequested` | no refresh token | clear, discarded | LoggedOut |
//! | Refreshing | `RefreshCompleted` | ok, decodes | persist, navigate | Authenticated |
//! | Refreshing | `RefreshCompleted` | failed or undecodable | clear, discarded | LoggedOut |
//! | LoggedOut | `SubmissionStarted` | - | submit | SubmissionInFlight |
//! | SubmissionInFlight(Login) | `LoginCompleted` | ok, decodes | persist, navigate | Authenticated |
//! | SubmissionInFlight(Login) | `LoginCompleted` | failed | login failed | LoggedOut |
//! | SubmissionInFlight(Signup) | `SignupCompleted` | ok | signup succeeded | LoggedOut |
//! | SubmissionInFlight(Signup) | `SignupCompleted` | failed | signup failed | LoggedOut |
//! | any | `LogoutRequested` | - | clear | LoggedOut |
//!
//! Any other combination is rejected with a [`SessionError`] and changes
//! nothing. In particular a second refresh or a second submission while
//! one is outstanding is refused, not queued.

use tokenkeep_gateway::GatewayError;
use tokenkeep_protocol::{Claims, DecodeError, TokenPair, decode};

use crate::{
    DiscardReason, Notice, SessionError, SessionProjection, SessionState,
    SubmissionKind, Ticket,
};

// ---------------------------------------------------------------------------
// Events and effects
// ---------------------------------------------------------------------------

/// Something that happened, fed into the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// The application started; these are the tokens found in storage.
    Startup {
        access: Option<String>,
        refresh: Option<String>,
    },

    /// Someone noticed the access token has expired.
    RefreshRequested,

    /// The refresh exchange for `ticket` finished.
    RefreshCompleted {
        ticket: Ticket,
        result: Result<TokenPair, GatewayError>,
    },

    /// A login or signup form was submitted.
    SubmissionStarted(SubmissionKind),

    /// The login request for `ticket` finished.
    LoginCompleted {
        ticket: Ticket,
        result: Result<TokenPair, GatewayError>,
    },

    /// The signup request for `ticket` finished.
    SignupCompleted {
        ticket: Ticket,
        result: Result<(), GatewayError>,
    },

    /// The user logged out.
    LogoutRequested,
}

/// Something the caller must do as a result of a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write this pair to the token store.
    Persist(TokenPair),

    /// Remove all tokens from the token store.
    ClearStore,

    /// Exchange `refresh_token` with the auth server, then feed back
    /// [`Event::RefreshCompleted`] with this ticket.
    Refresh {
        ticket: Ticket,
        refresh_token: String,
    },

    /// Send the pending form to the auth server, then feed back
    /// [`Event::LoginCompleted`] or [`Event::SignupCompleted`] with this
    /// ticket.
    Submit { ticket: Ticket, kind: SubmissionKind },

    /// Publish this notice to subscribers.
    Notify(Notice),
}

// ---------------------------------------------------------------------------
// Token assessment
// ---------------------------------------------------------------------------

/// What an access token is worth right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// Decoded, and not expired (or expiry wasn't checked).
    Valid(Claims),
    /// Decoded, but `exp < now`.
    Expired(Claims),
    /// Not decodable at all.
    Malformed(DecodeError),
}

/// Decodes `access` and, when `now` is given, checks its expiry.
///
/// This is the one place that turns a token string into a decision.
/// Stored tokens are checked against the clock; tokens the server has
/// just issued are taken as valid (`now = None`).
pub fn assess(access: &str, now: Option<u64>) -> Assessment {
    match decode(access) {
        Err(e) => Assessment::Malformed(e),
        Ok(claims) => match now {
            Some(now) if !claims.is_valid_at(now) => Assessment::Expired(claims),
            _ => Assessment::Valid(claims),
        },
    }
}

// ---------------------------------------------------------------------------
// SessionMachine
// ---------------------------------------------------------------------------

/// Owns the [`SessionState`] and applies the transition table.
///
/// ```rust
/// use tokenkeep_session::{Event, SessionMachine, SessionState};
///
/// let mut machine = SessionMachine::new();
/// let effects = machine
///     .handle(Event::Startup { access: None, refresh: None }, 1_000)
///     .unwrap();
///
/// assert!(effects.is_empty());
/// assert_eq!(machine.state(), &SessionState::LoggedOut);
/// ```
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,

    /// The one network request whose completion will be accepted.
    /// Cleared by the completion itself and by any transition that makes
    /// the request irrelevant (logout).
    pending: Option<Ticket>,

    last_ticket: u64,
}

impl SessionMachine {
    /// A machine in the LoggedOut state.
    pub fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
            pending: None,
            last_ticket: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The projection of the current state.
    pub fn projection(&self) -> SessionProjection {
        SessionProjection::of(&self.state)
    }

    /// The outstanding request, if any.
    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    /// Applies one event. `now` is wall-clock seconds since the epoch.
    ///
    /// # Errors
    /// The event doesn't apply in the current state; nothing changed.
    /// - [`SessionError::Superseded`] - a completion for a request that is
    ///   no longer outstanding
    /// - [`SessionError::RefreshInFlight`] / [`SessionError::SubmissionInFlight`]
    ///   - something is already waiting on the server
    /// - [`SessionError::AlreadyAuthenticated`] - startup or submission
    ///   while a session is active
    /// - [`SessionError::NoRefreshToken`] - refresh requested with no session
    pub fn handle(&mut self, event: Event, now: u64) -> Result<Vec<Effect>, SessionError> {
        match event {
            Event::Startup { access, refresh } => self.on_startup(access, refresh, now),
            Event::RefreshRequested => self.on_refresh_requested(),
            Event::RefreshCompleted { ticket, result } => {
                self.accept(ticket, |s| matches!(s, SessionState::Refreshing { .. }))?;
                Ok(match result {
                    Ok(pair) => self.adopt_issued(pair),
                    Err(e) => self.discard(DiscardReason::RefreshFailed(e)),
                })
            }
            Event::SubmissionStarted(kind) => self.on_submission_started(kind),
            Event::LoginCompleted { ticket, result } => {
                self.accept(ticket, |s| {
                    matches!(s, SessionState::SubmissionInFlight(SubmissionKind::Login))
                })?;
                Ok(match result {
                    Ok(pair) => self.adopt_issued(pair),
                    Err(e) => {
                        tracing::info!(error = %e, "login failed");
                        self.state = SessionState::LoggedOut;
                        vec![Effect::Notify(Notice::LoginFailed(e))]
                    }
                })
            }
            Event::SignupCompleted { ticket, result } => {
                self.accept(ticket, |s| {
                    matches!(s, SessionState::SubmissionInFlight(SubmissionKind::Signup))
                })?;
                self.state = SessionState::LoggedOut;
                Ok(match result {
                    Ok(()) => {
                        tracing::info!("signup succeeded");
                        vec![Effect::Notify(Notice::SignupSucceeded)]
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "signup failed");
                        vec![Effect::Notify(Notice::SignupFailed(e))]
                    }
                })
            }
            Event::LogoutRequested => Ok(self.on_logout()),
        }
    }

    // -- Transitions -------------------------------------------------------

    fn on_startup(
        &mut self,
        access: Option<String>,
        refresh: Option<String>,
        now: u64,
    ) -> Result<Vec<Effect>, SessionError> {
        self.reject_unless_logged_out()?;

        let Some(access) = access else {
            tracing::debug!("no stored access token");
            return Ok(Vec::new());
        };

        Ok(match assess(&access, Some(now)) {
            Assessment::Valid(claims) => {
                self.enter_authenticated(&claims, access, refresh)
            }
            Assessment::Expired(claims) => match refresh {
                Some(refresh) => {
                    tracing::info!(exp = claims.exp, now, "stored access token expired, refreshing");
                    self.begin_refresh(TokenPair { access, refresh })
                }
                None => self.discard(DiscardReason::NoRefreshToken),
            },
            Assessment::Malformed(e) => self.discard(DiscardReason::Malformed(e)),
        })
    }

    fn on_refresh_requested(&mut self) -> Result<Vec<Effect>, SessionError> {
        let stale = match &self.state {
            SessionState::Authenticated {
                access,
                refresh: Some(refresh),
                ..
            } => TokenPair {
                access: access.clone(),
                refresh: refresh.clone(),
            },
            SessionState::Authenticated { refresh: None, .. } => {
                return Ok(self.discard(DiscardReason::NoRefreshToken));
            }
            SessionState::Refreshing { .. } => return Err(SessionError::RefreshInFlight),
            SessionState::SubmissionInFlight(_) => {
                return Err(SessionError::SubmissionInFlight);
            }
            SessionState::LoggedOut => return Err(SessionError::NoRefreshToken),
        };
        Ok(self.begin_refresh(stale))
    }

    fn on_submission_started(
        &mut self,
        kind: SubmissionKind,
    ) -> Result<Vec<Effect>, SessionError> {
        self.reject_unless_logged_out()?;
        let ticket = self.issue_ticket();
        self.state = SessionState::SubmissionInFlight(kind);
        tracing::debug!(%kind, %ticket, "submission started");
        Ok(vec![Effect::Submit { ticket, kind }])
    }

    fn on_logout(&mut self) -> Vec<Effect> {
        if let Some(ticket) = self.pending.take() {
            tracing::debug!(%ticket, "outstanding request abandoned by logout");
        }
        if self.state != SessionState::LoggedOut {
            tracing::info!(from = %self.state, "logged out");
            self.state = SessionState::LoggedOut;
        }
        vec![Effect::ClearStore]
    }

    // -- Helpers -----------------------------------------------------------

    fn reject_unless_logged_out(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::LoggedOut => Ok(()),
            SessionState::Authenticated { .. } => Err(SessionError::AlreadyAuthenticated),
            SessionState::Refreshing { .. } => Err(SessionError::RefreshInFlight),
            SessionState::SubmissionInFlight(_) => Err(SessionError::SubmissionInFlight),
        }
    }

    /// Accepts a completion if its ticket is the outstanding one and the
    /// state still matches what the request was issued from.
    fn accept(
        &mut self,
        ticket: Ticket,
        expected: impl Fn(&SessionState) -> bool,
    ) -> Result<(), SessionError> {
        if self.pending == Some(ticket) && expected(&self.state) {
            self.pending = None;
            return Ok(());
        }
        tracing::debug!(%ticket, state = %self.state, "discarding stale completion");
        Err(SessionError::Superseded(ticket))
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.last_ticket += 1;
        let ticket = Ticket(self.last_ticket);
        self.pending = Some(ticket);
        ticket
    }

    fn begin_refresh(&mut self, stale: TokenPair) -> Vec<Effect> {
        let ticket = self.issue_ticket();
        let refresh_token = stale.refresh.clone();
        self.state = SessionState::Refreshing { stale };
        vec![Effect::Refresh {
            ticket,
            refresh_token,
        }]
    }

    /// Adopts a pair the server just issued (login or refresh).
    fn adopt_issued(&mut self, pair: TokenPair) -> Vec<Effect> {
        match assess(&pair.access, None) {
            Assessment::Valid(claims) | Assessment::Expired(claims) => {
                let mut effects = vec![Effect::Persist(pair.clone())];
                effects.extend(self.enter_authenticated(
                    &claims,
                    pair.access,
                    Some(pair.refresh),
                ));
                effects
            }
            Assessment::Malformed(e) => self.discard(DiscardReason::Malformed(e)),
        }
    }

    /// The only way into Authenticated. Emits the navigation notice
    /// exactly once per entry.
    fn enter_authenticated(
        &mut self,
        claims: &Claims,
        access: String,
        refresh: Option<String>,
    ) -> Vec<Effect> {
        let identity = claims.identity();
        tracing::info!(
            username = %identity.username,
            exp = claims.exp,
            can_refresh = refresh.is_some(),
            "session authenticated"
        );
        self.state = SessionState::Authenticated {
            identity: identity.clone(),
            access,
            refresh,
        };
        vec![Effect::Notify(Notice::NavigateToAuthenticated(identity))]
    }

    /// Forced logout: clears the store and drops any outstanding request.
    fn discard(&mut self, reason: DiscardReason) -> Vec<Effect> {
        tracing::warn!(?reason, "session discarded");
        self.state = SessionState::LoggedOut;
        self.pending = None;
        vec![
            Effect::ClearStore,
            Effect::Notify(Notice::SessionDiscarded(reason)),
        ]
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
