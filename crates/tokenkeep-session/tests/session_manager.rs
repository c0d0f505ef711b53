//! Integration tests for the session manager, driven against a scripted
//! gateway and an in-memory token store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::Semaphore;
use tokio::sync::broadcast::error::TryRecvError;
use tokenkeep_gateway::{AuthGateway, GatewayError};
use tokenkeep_protocol::{LoginRequest, RegisterRequest, TokenPair, ValidationError, now_secs};
use tokenkeep_session::{
    DiscardReason, Notice, SessionError, SessionManager, SessionProjection, SessionState,
};
use tokenkeep_store::{MemoryStorage, StorageBackend, StoreError, TokenStore};

// =========================================================================
// Helpers
// =========================================================================

/// A gateway that answers from a script and counts its calls.
///
/// When built with [`ScriptedGateway::gated`], every call waits until the
/// test calls [`release`](ScriptedGateway::release), so the test can act
/// while the request is in flight.
struct ScriptedGateway {
    login_calls: AtomicUsize,
    register_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    login_result: Mutex<Result<TokenPair, GatewayError>>,
    register_result: Mutex<Result<(), GatewayError>>,
    refresh_result: Mutex<Result<TokenPair, GatewayError>>,
    gate: Option<Semaphore>,
}

impl ScriptedGateway {
    fn new() -> Self {
        let unscripted = || GatewayError::Unreachable("unscripted call".into());
        Self {
            login_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            login_result: Mutex::new(Err(unscripted())),
            register_result: Mutex::new(Err(unscripted())),
            refresh_result: Mutex::new(Err(unscripted())),
            gate: None,
        }
    }

    fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    fn with_login(self, result: Result<TokenPair, GatewayError>) -> Self {
        *self.login_result.lock().unwrap() = result;
        self
    }

    fn with_register(self, result: Result<(), GatewayError>) -> Self {
        *self.register_result.lock().unwrap() = result;
        self
    }

    fn with_refresh(self, result: Result<TokenPair, GatewayError>) -> Self {
        *self.refresh_result.lock().unwrap() = result;
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
    }
}

impl AuthGateway for ScriptedGateway {
    async fn login(&self, _: &LoginRequest) -> Result<TokenPair, GatewayError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.login_result.lock().unwrap().clone()
    }

    async fn register(&self, _: &RegisterRequest) -> Result<(), GatewayError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.register_result.lock().unwrap().clone()
    }

    async fn refresh(&self, _: &str) -> Result<TokenPair, GatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.refresh_result.lock().unwrap().clone()
    }
}

/// Counts removals so a test can tell whether the store was cleared.
#[derive(Clone, Default)]
struct CountingStorage {
    inner: MemoryStorage,
    removes: Arc<AtomicUsize>,
}

impl StorageBackend for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// Reads nothing and refuses every write, like a full disk.
#[derive(Clone, Default)]
struct ReadOnlyStorage;

impl StorageBackend for ReadOnlyStorage {
    fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("read-only")))
    }

    fn remove(&self, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("read-only")))
    }
}

fn token(username: &str, exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"user_id":1,"username":"{username}","email":"{username}@example.com","exp":{exp}}}"#
    ));
    format!("{header}.{payload}.signature")
}

fn valid_token(username: &str) -> String {
    token(username, now_secs() + 3600)
}

fn expired_token(username: &str) -> String {
    token(username, now_secs() - 3600)
}

/// Storage pre-loaded with `access` (and `refresh`, if given).
fn stored(access: &str, refresh: Option<&str>) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.set("accessToken", access).unwrap();
    if let Some(refresh) = refresh {
        storage.set("refreshToken", refresh).unwrap();
    }
    storage
}

fn manager(
    gateway: ScriptedGateway,
    storage: &MemoryStorage,
) -> SessionManager<ScriptedGateway, MemoryStorage> {
    SessionManager::new(gateway, TokenStore::new(storage.clone()))
}

fn ada_login() -> LoginRequest {
    LoginRequest::new("ada", "lovelace1")
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(notice) => out.push(notice),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

// =========================================================================
// startup
// =========================================================================

#[tokio::test]
async fn test_startup_valid_token_authenticates_without_network() {
    let storage = stored(&valid_token("ada"), Some("R1"));
    let session = manager(ScriptedGateway::new(), &storage);

    let view = session.startup().await.unwrap();

    assert!(view.is_authenticated);
    assert_eq!(view.username(), "ada");
    assert_eq!(session.gateway().refresh_calls(), 0);
    assert_eq!(session.gateway().login_calls(), 0);
}

#[tokio::test]
async fn test_startup_expired_token_refreshes_exactly_once() {
    let a2 = valid_token("ada");
    let storage = stored(&expired_token("ada"), Some("R1"));
    let gateway = ScriptedGateway::new().with_refresh(Ok(TokenPair::new(a2.clone(), "R2")));
    let session = manager(gateway, &storage);

    let view = session.startup().await.unwrap();

    assert!(view.is_authenticated);
    assert_eq!(session.gateway().refresh_calls(), 1);
    let store = TokenStore::new(storage.clone());
    assert_eq!(store.load().unwrap(), Some(TokenPair::new(a2, "R2")));
}

#[tokio::test]
async fn test_startup_expired_token_without_refresh_logs_out_without_network() {
    let storage = stored(&expired_token("ada"), None);
    let session = manager(ScriptedGateway::new(), &storage);

    let view = session.startup().await.unwrap();

    assert_eq!(view, SessionProjection::default());
    assert_eq!(session.gateway().refresh_calls(), 0);
    assert!(storage.is_empty(), "stale access token should be cleared");
}

#[tokio::test]
async fn test_startup_rejected_refresh_logs_out_and_clears_store() {
    let storage = stored(&expired_token("ada"), Some("R1"));
    let gateway = ScriptedGateway::new()
        .with_refresh(Err(GatewayError::Rejected("Token is invalid or expired".into())));
    let session = manager(gateway, &storage);
    let mut notices = session.notices();

    let view = session.startup().await.unwrap();

    assert!(!view.is_authenticated);
    assert!(storage.is_empty());
    assert_eq!(
        drain(&mut notices),
        vec![Notice::SessionDiscarded(DiscardReason::RefreshFailed(
            GatewayError::Rejected("Token is invalid or expired".into())
        ))]
    );
}

#[tokio::test]
async fn test_startup_malformed_token_clears_store() {
    let storage = stored("not-a-token", Some("R1"));
    let session = manager(ScriptedGateway::new(), &storage);
    let mut notices = session.notices();

    let view = session.startup().await.unwrap();

    assert!(!view.is_authenticated);
    assert!(storage.is_empty());
    assert!(matches!(
        drain(&mut notices).as_slice(),
        [Notice::SessionDiscarded(DiscardReason::Malformed(_))]
    ));
}

#[tokio::test]
async fn test_startup_empty_store_stays_logged_out_without_writes() {
    let storage = CountingStorage::default();
    let session = SessionManager::new(ScriptedGateway::new(), TokenStore::new(storage.clone()));

    let view = session.startup().await.unwrap();

    assert_eq!(view, SessionProjection::default());
    assert_eq!(storage.removes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_startup_twice_is_rejected() {
    let storage = stored(&valid_token("ada"), Some("R1"));
    let session = manager(ScriptedGateway::new(), &storage);
    session.startup().await.unwrap();

    let second = session.startup().await;

    assert!(matches!(second, Err(SessionError::AlreadyAuthenticated)));
}

// =========================================================================
// login / register
// =========================================================================

#[tokio::test]
async fn test_login_success_persists_tokens_and_authenticates() {
    let a1 = valid_token("ada");
    let storage = MemoryStorage::new();
    let gateway = ScriptedGateway::new().with_login(Ok(TokenPair::new(a1.clone(), "R1")));
    let session = manager(gateway, &storage);
    let mut updates = session.subscribe();

    let view = session.login(ada_login()).await.unwrap();

    assert!(view.is_authenticated);
    assert_eq!(view.identity.as_ref().unwrap().email, "ada@example.com");
    assert_eq!(
        TokenStore::new(storage.clone()).load().unwrap(),
        Some(TokenPair::new(a1, "R1"))
    );
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_authenticated);
}

#[tokio::test]
async fn test_login_with_failing_store_still_authenticates() {
    let gateway = ScriptedGateway::new().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = SessionManager::new(gateway, TokenStore::new(ReadOnlyStorage));

    let view = session.login(ada_login()).await.unwrap();

    assert!(view.is_authenticated);
    session.logout().await.unwrap();
    assert!(!session.projection().is_authenticated);
}

#[tokio::test]
async fn test_login_rejected_leaves_store_untouched_and_reports_message() {
    let storage = MemoryStorage::new();
    let gateway = ScriptedGateway::new()
        .with_login(Err(GatewayError::Rejected("bad credentials".into())));
    let session = manager(gateway, &storage);
    let mut notices = session.notices();

    let err = session.login(ada_login()).await.unwrap_err();

    assert_eq!(err.to_string(), "bad credentials");
    assert!(storage.is_empty());
    assert_eq!(session.projection(), SessionProjection::default());
    assert_eq!(
        drain(&mut notices),
        vec![Notice::LoginFailed(GatewayError::Rejected("bad credentials".into()))]
    );
}

#[tokio::test]
async fn test_login_invalid_form_is_not_sent() {
    let session = manager(ScriptedGateway::new(), &MemoryStorage::new());

    let err = session
        .login(LoginRequest::new("ada", "short"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::PasswordTooShort { .. })
    ));
    assert_eq!(session.gateway().login_calls(), 0);
    assert_eq!(session.state().await, SessionState::LoggedOut);
}

#[tokio::test]
async fn test_login_notifies_navigation_exactly_once() {
    let gateway =
        ScriptedGateway::new().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = manager(gateway, &MemoryStorage::new());
    let mut notices = session.notices();

    session.login(ada_login()).await.unwrap();

    let navigations = drain(&mut notices)
        .into_iter()
        .filter(|n| matches!(n, Notice::NavigateToAuthenticated(_)))
        .count();
    assert_eq!(navigations, 1);
}

#[tokio::test]
async fn test_login_while_authenticated_is_rejected() {
    let storage = stored(&valid_token("ada"), Some("R1"));
    let session = manager(ScriptedGateway::new(), &storage);
    session.startup().await.unwrap();

    let err = session.login(ada_login()).await.unwrap_err();

    assert!(matches!(err, SessionError::AlreadyAuthenticated));
    assert_eq!(session.gateway().login_calls(), 0);
}

#[tokio::test]
async fn test_register_success_stays_logged_out() {
    let storage = MemoryStorage::new();
    let session = manager(ScriptedGateway::new().with_register(Ok(())), &storage);
    let mut notices = session.notices();

    session
        .register(RegisterRequest::new("ada", "ada@example.com", "lovelace1"))
        .await
        .unwrap();

    assert_eq!(session.projection(), SessionProjection::default());
    assert!(storage.is_empty());
    assert_eq!(drain(&mut notices), vec![Notice::SignupSucceeded]);
    assert_eq!(session.gateway().register_calls(), 1);
}

#[tokio::test]
async fn test_register_rejected_reports_fallback_message() {
    let gateway = ScriptedGateway::new()
        .with_register(Err(GatewayError::Rejected("signup failed".into())));
    let session = manager(gateway, &MemoryStorage::new());

    let err = session
        .register(RegisterRequest::new("ada", "ada@example.com", "lovelace1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "signup failed");
    assert!(!session.projection().is_submitting);
}

#[tokio::test]
async fn test_register_invalid_email_is_not_sent() {
    let session = manager(ScriptedGateway::new(), &MemoryStorage::new());

    let err = session
        .register(RegisterRequest::new("ada", "not-an-email", "lovelace1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::InvalidEmail)
    ));
    assert_eq!(session.gateway().register_calls(), 0);
}

// =========================================================================
// refresh / access_token
// =========================================================================

#[tokio::test]
async fn test_refresh_replaces_both_tokens() {
    let a2 = valid_token("ada");
    let storage = MemoryStorage::new();
    let gateway = ScriptedGateway::new()
        .with_login(Ok(TokenPair::new(valid_token("ada"), "R1")))
        .with_refresh(Ok(TokenPair::new(a2.clone(), "R2")));
    let session = manager(gateway, &storage);
    session.login(ada_login()).await.unwrap();

    let view = session.refresh().await.unwrap();

    assert!(view.is_authenticated);
    assert_eq!(
        TokenStore::new(storage.clone()).load().unwrap(),
        Some(TokenPair::new(a2.clone(), "R2"))
    );
    assert_eq!(session.access_token().await.unwrap(), a2);
}

#[tokio::test]
async fn test_refresh_rejected_ends_session() {
    let storage = MemoryStorage::new();
    let gateway = ScriptedGateway::new()
        .with_login(Ok(TokenPair::new(valid_token("ada"), "R1")))
        .with_refresh(Err(GatewayError::Rejected("Token is invalid or expired".into())));
    let session = manager(gateway, &storage);
    session.login(ada_login()).await.unwrap();

    let err = session.refresh().await.unwrap_err();

    assert!(matches!(err, SessionError::Gateway(GatewayError::Rejected(_))));
    assert!(storage.is_empty());
    assert_eq!(session.state().await, SessionState::LoggedOut);
}

#[tokio::test]
async fn test_refresh_without_refresh_token_ends_session() {
    let storage = stored(&valid_token("ada"), None);
    let session = manager(ScriptedGateway::new(), &storage);
    session.startup().await.unwrap();
    assert!(session.projection().is_authenticated);

    let err = session.refresh().await.unwrap_err();

    assert!(matches!(err, SessionError::NoRefreshToken));
    assert!(!session.projection().is_authenticated);
    assert_eq!(session.gateway().refresh_calls(), 0);
}

#[tokio::test]
async fn test_access_token_valid_returns_without_network() {
    let a1 = valid_token("ada");
    let storage = stored(&a1, Some("R1"));
    let session = manager(ScriptedGateway::new(), &storage);
    session.startup().await.unwrap();

    assert_eq!(session.access_token().await.unwrap(), a1);
    assert_eq!(session.gateway().refresh_calls(), 0);
}

#[tokio::test]
async fn test_access_token_expired_refreshes_first() {
    // The server issued an already-expired token; it is adopted as-is and
    // renewed on first use.
    let a2 = valid_token("ada");
    let gateway = ScriptedGateway::new()
        .with_login(Ok(TokenPair::new(expired_token("ada"), "R1")))
        .with_refresh(Ok(TokenPair::new(a2.clone(), "R2")));
    let session = manager(gateway, &MemoryStorage::new());
    session.login(ada_login()).await.unwrap();

    let access = session.access_token().await.unwrap();

    assert_eq!(access, a2);
    assert_eq!(session.gateway().refresh_calls(), 1);
}

#[tokio::test]
async fn test_access_token_logged_out_is_not_authenticated() {
    let session = manager(ScriptedGateway::new(), &MemoryStorage::new());

    let err = session.access_token().await.unwrap_err();

    assert!(matches!(err, SessionError::NotAuthenticated));
}

// =========================================================================
// logout
// =========================================================================

#[tokio::test]
async fn test_logout_twice_clears_store_once() {
    let storage = CountingStorage::default();
    storage.set("accessToken", &valid_token("ada")).unwrap();
    storage.set("refreshToken", "R1").unwrap();
    let session = SessionManager::new(ScriptedGateway::new(), TokenStore::new(storage.clone()));
    session.startup().await.unwrap();

    session.logout().await.unwrap();
    let after_first = session.state().await;
    let removes_after_first = storage.removes.load(Ordering::SeqCst);
    session.logout().await.unwrap();

    assert_eq!(session.state().await, after_first);
    assert_eq!(removes_after_first, 2);
    assert_eq!(storage.removes.load(Ordering::SeqCst), 2, "second logout removed nothing");
}

#[tokio::test]
async fn test_login_logout_startup_round_trip() {
    let storage = MemoryStorage::new();
    let gateway =
        ScriptedGateway::new().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = manager(gateway, &storage);

    session.login(ada_login()).await.unwrap();
    let restarted = manager(ScriptedGateway::new(), &storage);
    assert!(restarted.startup().await.unwrap().is_authenticated);

    session.logout().await.unwrap();
    let restarted = manager(ScriptedGateway::new(), &storage);
    assert!(!restarted.startup().await.unwrap().is_authenticated);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test]
async fn test_second_login_while_first_in_flight_is_rejected() {
    let gateway =
        ScriptedGateway::gated().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = manager(gateway, &MemoryStorage::new());

    let first = session.login(ada_login());
    let second = async {
        tokio::task::yield_now().await;
        assert!(session.projection().is_submitting);
        let result = session.login(LoginRequest::new("bob", "builder99")).await;
        session.gateway().release();
        result
    };
    let (first, second) = futures_util::join!(first, second);

    assert!(first.unwrap().is_authenticated);
    assert!(matches!(second, Err(SessionError::SubmissionInFlight)));
    assert_eq!(session.gateway().login_calls(), 1);
    assert_eq!(session.projection().username(), "ada");
}

#[tokio::test]
async fn test_logout_during_login_drops_late_tokens() {
    let storage = MemoryStorage::new();
    let gateway =
        ScriptedGateway::gated().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = manager(gateway, &storage);

    let login = session.login(ada_login());
    let logout = async {
        tokio::task::yield_now().await;
        session.logout().await.unwrap();
        session.gateway().release();
    };
    let (login, ()) = futures_util::join!(login, logout);

    assert!(matches!(login, Err(SessionError::Superseded(_))));
    assert_eq!(session.projection(), SessionProjection::default());
    assert!(storage.is_empty(), "late login must not write tokens");
}

#[tokio::test]
async fn test_refresh_while_refreshing_is_rejected() {
    let storage = stored(&expired_token("ada"), Some("R1"));
    let gateway =
        ScriptedGateway::gated().with_refresh(Ok(TokenPair::new(valid_token("ada"), "R2")));
    let session = manager(gateway, &storage);

    let startup = session.startup();
    let second = async {
        tokio::task::yield_now().await;
        let result = session.refresh().await;
        session.gateway().release();
        result
    };
    let (startup, second) = futures_util::join!(startup, second);

    assert!(startup.unwrap().is_authenticated);
    assert!(matches!(second, Err(SessionError::RefreshInFlight)));
    assert_eq!(session.gateway().refresh_calls(), 1);
}

#[tokio::test]
async fn test_shared_across_tasks() {
    let gateway =
        ScriptedGateway::new().with_login(Ok(TokenPair::new(valid_token("ada"), "R1")));
    let session = Arc::new(manager(gateway, &MemoryStorage::new()));
    let mut updates = session.subscribe();

    let task = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.login(ada_login()).await }
    });
    updates.changed().await.unwrap();

    task.await.unwrap().unwrap();
    assert!(session.projection().is_authenticated);
}
