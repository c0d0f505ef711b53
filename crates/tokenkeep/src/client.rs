//! `SessionBuilder`: wires an HTTP gateway and a token store into a
//! [`SessionManager`].
//!
//! This is the entry point for an application. It ties the layers
//! together: config → gateway + store → session.

use std::path::PathBuf;

use tokenkeep_gateway::HttpGateway;
use tokenkeep_session::SessionManager;
use tokenkeep_store::{FileStorage, StorageBackend, TokenStore};

use crate::{Config, TokenkeepError};

/// A session talking HTTP and keeping its tokens in a JSON file.
pub type Session = SessionManager<HttpGateway, FileStorage>;

/// Builder for a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use tokenkeep::prelude::*;
///
/// # async fn run() -> Result<(), TokenkeepError> {
/// let config = Config::from_env()?;
/// let session = SessionBuilder::from_config(&config).start().await?;
///
/// if !session.projection().is_authenticated {
///     session.login(LoginRequest::new("ada", "lovelace1")).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    base_url: String,
    storage_path: PathBuf,
    client: Option<reqwest::Client>,
}

impl SessionBuilder {
    /// Creates a builder with development defaults.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Creates a builder from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            storage_path: config.storage_path.clone(),
            client: None,
        }
    }

    /// Sets the auth API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the token file.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Uses an existing `reqwest` client (and its connection pool,
    /// proxies, timeouts).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds a LoggedOut session. Call
    /// [`startup`](SessionManager::startup) before using it.
    pub fn build(self) -> Session {
        let storage = FileStorage::new(self.storage_path.clone());
        self.build_with_storage(storage)
    }

    /// Builds a session over any storage backend.
    pub fn build_with_storage<B: StorageBackend>(
        self,
        backend: B,
    ) -> SessionManager<HttpGateway, B> {
        let gateway = match self.client {
            Some(client) => HttpGateway::with_client(client, self.base_url),
            None => HttpGateway::new(self.base_url),
        };
        tracing::debug!(base_url = gateway.base_url(), "session built");
        SessionManager::new(gateway, TokenStore::new(backend))
    }

    /// Builds the session and restores it from storage.
    pub async fn start(self) -> Result<Session, TokenkeepError> {
        let session = self.build();
        let view = session.startup().await?;
        tracing::info!(
            authenticated = view.is_authenticated,
            username = view.username(),
            "session started"
        );
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
