//! The session manager: drives the [`SessionMachine`] against a real
//! gateway and token store.
//!
//! Each public operation follows the same shape:
//!
//! 1. Lock the core, feed an event to the machine, carry out the storage
//!    effects, publish the new projection. Unlock.
//! 2. If the machine asked for a network call, make it with NO lock held.
//! 3. Lock again, feed the completion back in (with the ticket the
//!    machine issued), carry out its effects. Unlock.
//!
//! Because the lock is never held across a network await, a logout can
//! run while a login or refresh is outstanding. The machine then rejects
//! the late completion as superseded, so it cannot bring the session back.

use tokio::sync::{Mutex, broadcast, watch};
use tokenkeep_gateway::AuthGateway;
use tokenkeep_protocol::{LoginRequest, RegisterRequest, now_secs};
use tokenkeep_store::{StorageBackend, TokenStore};

use crate::machine::{Assessment, assess};
use crate::{
    Effect, Event, Notice, SessionError, SessionMachine, SessionProjection,
    SessionState, SubmissionKind, Ticket,
};

/// How many notices a slow subscriber may fall behind before it starts
/// missing them.
const NOTICE_CAPACITY: usize = 64;

/// The machine and the store it's allowed to write. Locked together so a
/// transition and its storage effects are never interleaved with another.
struct Core<B: StorageBackend> {
    machine: SessionMachine,
    store: TokenStore<B>,
}

/// A network call the machine asked for.
enum Call {
    Refresh { ticket: Ticket, refresh_token: String },
    Submit(Ticket),
}

/// The outcome of one locked step.
struct Step {
    call: Option<Call>,
    notices: Vec<Notice>,
    projection: SessionProjection,
}

impl Step {
    /// Turns a failure notice from this step into an error for the caller.
    fn check(self) -> Result<SessionProjection, SessionError> {
        match self.notices.iter().find_map(Notice::as_error) {
            Some(err) => Err(err),
            None => Ok(self.projection),
        }
    }

    fn submission(&self) -> Result<Ticket, SessionError> {
        match self.call {
            Some(Call::Submit(ticket)) => Ok(ticket),
            _ => Err(SessionError::SubmissionInFlight),
        }
    }
}

/// The client's session, shared by everything that needs to know who is
/// signed in.
///
/// Wrap it in an `Arc` to share it between tasks; every method takes
/// `&self`.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), tokenkeep_session::SessionError> {
/// use tokenkeep_gateway::HttpGateway;
/// use tokenkeep_protocol::LoginRequest;
/// use tokenkeep_session::SessionManager;
/// use tokenkeep_store::{MemoryStorage, TokenStore};
///
/// let session = SessionManager::new(
///     HttpGateway::new("http://127.0.0.1:8000"),
///     TokenStore::new(MemoryStorage::new()),
/// );
///
/// session.startup().await?;
/// let view = session.login(LoginRequest::new("ada", "lovelace1")).await?;
/// println!("signed in as {}", view.username());
/// # Ok(())
/// # }
/// ```
pub struct SessionManager<G: AuthGateway, B: StorageBackend> {
    gateway: G,
    core: Mutex<Core<B>>,
    projection: watch::Sender<SessionProjection>,
    notices: broadcast::Sender<Notice>,
}

impl<G: AuthGateway, B: StorageBackend> SessionManager<G, B> {
    /// Creates a manager in the LoggedOut state. Nothing is read from the
    /// store until [`startup`](Self::startup).
    pub fn new(gateway: G, store: TokenStore<B>) -> Self {
        let (projection, _) = watch::channel(SessionProjection::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            gateway,
            core: Mutex::new(Core {
                machine: SessionMachine::new(),
                store,
            }),
            projection,
            notices,
        }
    }

    /// Subscribes to projection updates. The receiver starts with the
    /// current projection and sees every change after it.
    pub fn subscribe(&self) -> watch::Receiver<SessionProjection> {
        self.projection.subscribe()
    }

    /// Subscribes to notices published from now on.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// The current projection.
    pub fn projection(&self) -> SessionProjection {
        self.projection.borrow().clone()
    }

    /// A snapshot of the full state. Contains tokens; don't log it.
    pub async fn state(&self) -> SessionState {
        self.core.lock().await.machine.state().clone()
    }

    /// The gateway this manager talks to.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // -- Operations --------------------------------------------------------

    /// Restores the session from the store, once, at application start.
    ///
    /// A valid stored token is adopted without any network call. An
    /// expired one is refreshed (one call). A refresh failure is not an
    /// error here: the session simply ends up LoggedOut and the reason is
    /// published as a [`Notice::SessionDiscarded`].
    ///
    /// # Errors
    /// Only if the manager has already left the LoggedOut state.
    pub async fn startup(&self) -> Result<SessionProjection, SessionError> {
        let mut step = {
            let mut core = self.core.lock().await;
            let access = read_or_warn(core.store.access_token(), "access");
            let refresh = read_or_warn(core.store.refresh_token(), "refresh");
            self.step(&mut core, Event::Startup { access, refresh })?
        };

        match step.call.take() {
            Some(Call::Refresh {
                ticket,
                refresh_token,
            }) => match self.run_refresh(ticket, &refresh_token).await {
                Ok(projection) => Ok(projection),
                Err(e) => {
                    tracing::debug!(error = %e, "startup refresh did not restore the session");
                    Ok(self.projection())
                }
            },
            _ => Ok(step.projection),
        }
    }

    /// Logs in. On success the session is Authenticated and the tokens
    /// are stored.
    ///
    /// # Errors
    /// - [`SessionError::Validation`]: the form is invalid; nothing was sent
    /// - [`SessionError::Gateway`]: the server refused or was unreachable
    /// - [`SessionError::SubmissionInFlight`], [`SessionError::AlreadyAuthenticated`],
    ///   [`SessionError::RefreshInFlight`]: not accepted in the current state
    /// - [`SessionError::Superseded`]: the session moved on (e.g. logout)
    ///   before the server answered; the answer was dropped
    pub async fn login(
        &self,
        request: LoginRequest,
    ) -> Result<SessionProjection, SessionError> {
        request.validate()?;
        let ticket = self.begin(SubmissionKind::Login).await?;

        let result = self.gateway.login(&request).await;

        let mut core = self.core.lock().await;
        self.step(&mut core, Event::LoginCompleted { ticket, result })?
            .check()
    }

    /// Creates an account. Success leaves the session LoggedOut; the user
    /// logs in separately.
    ///
    /// # Errors
    /// As for [`login`](Self::login).
    pub async fn register(&self, request: RegisterRequest) -> Result<(), SessionError> {
        request.validate()?;
        let ticket = self.begin(SubmissionKind::Signup).await?;

        let result = self.gateway.register(&request).await;

        let mut core = self.core.lock().await;
        self.step(&mut core, Event::SignupCompleted { ticket, result })?
            .check()
            .map(|_| ())
    }

    /// Exchanges the refresh token for a new pair.
    ///
    /// # Errors
    /// - [`SessionError::RefreshInFlight`]: a refresh is already outstanding
    /// - [`SessionError::NoRefreshToken`]: there is nothing to refresh
    ///   with; if a session existed it has been ended
    /// - [`SessionError::Gateway`] / [`SessionError::Decode`]: the exchange
    ///   failed and the session has been ended
    pub async fn refresh(&self) -> Result<SessionProjection, SessionError> {
        let mut step = {
            let mut core = self.core.lock().await;
            self.step(&mut core, Event::RefreshRequested)?
        };

        match step.call.take() {
            Some(Call::Refresh {
                ticket,
                refresh_token,
            }) => self.run_refresh(ticket, &refresh_token).await,
            _ => step.check(),
        }
    }

    /// Ends the session and clears the store. Always succeeds; logging out
    /// twice is the same as logging out once.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut core = self.core.lock().await;
        self.step(&mut core, Event::LogoutRequested)?;
        Ok(())
    }

    /// The access token to put on an application request.
    ///
    /// If the stored token has expired it is refreshed first, and the new
    /// one is returned.
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`]: there is no session
    /// - [`SessionError::RefreshInFlight`] / [`SessionError::SubmissionInFlight`]:
    ///   the session is waiting on the server
    /// - anything [`refresh`](Self::refresh) returns
    pub async fn access_token(&self) -> Result<String, SessionError> {
        {
            let core = self.core.lock().await;
            match core.machine.state() {
                SessionState::Authenticated { access, .. } => {
                    if let Assessment::Valid(_) = assess(access, Some(now_secs())) {
                        return Ok(access.clone());
                    }
                    tracing::debug!("access token expired, refreshing before use");
                }
                SessionState::LoggedOut => return Err(SessionError::NotAuthenticated),
                SessionState::Refreshing { .. } => return Err(SessionError::RefreshInFlight),
                SessionState::SubmissionInFlight(_) => {
                    return Err(SessionError::SubmissionInFlight);
                }
            }
        }

        self.refresh().await?;

        match self.core.lock().await.machine.state() {
            SessionState::Authenticated { access, .. } => Ok(access.clone()),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    // -- Internals ---------------------------------------------------------

    async fn begin(&self, kind: SubmissionKind) -> Result<Ticket, SessionError> {
        let mut core = self.core.lock().await;
        self.step(&mut core, Event::SubmissionStarted(kind))?
            .submission()
    }

    async fn run_refresh(
        &self,
        ticket: Ticket,
        refresh_token: &str,
    ) -> Result<SessionProjection, SessionError> {
        let result = self.gateway.refresh(refresh_token).await;

        let mut core = self.core.lock().await;
        self.step(&mut core, Event::RefreshCompleted { ticket, result })?
            .check()
    }

    /// Feeds one event to the machine and carries out what it asks for,
    /// except network calls, which are handed back to the caller.
    fn step(&self, core: &mut Core<B>, event: Event) -> Result<Step, SessionError> {
        let effects = core.machine.handle(event, now_secs())?;

        let mut call = None;
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Persist(pair) => {
                    if let Err(e) = core.store.save(&pair) {
                        tracing::warn!(error = %e, "failed to persist tokens");
                    }
                }
                Effect::ClearStore => match core.store.clear() {
                    Ok(removed) => tracing::debug!(removed, "token store cleared"),
                    Err(e) => tracing::warn!(error = %e, "failed to clear token store"),
                },
                Effect::Refresh {
                    ticket,
                    refresh_token,
                } => {
                    call = Some(Call::Refresh {
                        ticket,
                        refresh_token,
                    });
                }
                Effect::Submit { ticket, .. } => call = Some(Call::Submit(ticket)),
                Effect::Notify(notice) => notices.push(notice),
            }
        }

        let projection = core.machine.projection();
        self.projection.send_if_modified(|current| {
            if *current == projection {
                return false;
            }
            *current = projection.clone();
            true
        });

        for notice in &notices {
            // No subscribers is fine.
            let _ = self.notices.send(notice.clone());
        }

        Ok(Step {
            call,
            notices,
            projection,
        })
    }
}

fn read_or_warn(
    result: Result<Option<String>, tokenkeep_store::StoreError>,
    which: &str,
) -> Option<String> {
    result.unwrap_or_else(|e| {
        tracing::warn!(token = which, error = %e, "failed to read stored token");
        None
    })
}
