//! HTTP gateway implementation using `reqwest`.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokenkeep_protocol::{
    ErrorBody, LoginRequest, RefreshRequest, RegisterRequest, TokenPair,
};

use crate::{AuthGateway, GatewayError};

/// Login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "/auth/login/";
/// Registration endpoint, relative to the base URL.
pub const REGISTER_PATH: &str = "/auth/register/";
/// Token refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

#[derive(Debug, Clone, Copy)]
enum Operation {
    Login,
    Register,
    Refresh,
}

impl Operation {
    fn path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::Register => REGISTER_PATH,
            Self::Refresh => REFRESH_PATH,
        }
    }

    /// What the user sees when the server rejects without a message.
    fn fallback_message(self) -> &'static str {
        match self {
            Self::Login => "login failed",
            Self::Register => "signup failed",
            Self::Refresh => "token refresh failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Register => write!(f, "register"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// An [`AuthGateway`] that talks JSON over HTTP to a single base URL.
///
/// All three calls are `POST` with a JSON body:
///
/// | Call | Path | Body | Success body |
/// |---|---|---|---|
/// | login | `/auth/login/` | `{username, password}` | `{access, refresh}` |
/// | register | `/auth/register/` | `{username, email, password}` | ignored |
/// | refresh | `/auth/token/refresh/` | `{refresh}` | `{access, refresh}` |
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Creates a gateway for the API at `base_url` (e.g.
    /// `http://127.0.0.1:8000`). A trailing `/` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Like [`new`](Self::new), reusing an existing client (and its
    /// connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// The API root this gateway talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts an application request carrying `Authorization: Bearer <access>`.
    ///
    /// For calls outside the auth endpoints (the application's own API).
    /// `path` is relative to the base URL.
    pub fn authorized(
        &self,
        method: reqwest::Method,
        path: &str,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(access_token)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Sends one JSON `POST` and maps the outcome onto [`GatewayError`].
    ///
    /// Returns the raw success body.
    async fn post<B: Serialize>(
        &self,
        op: Operation,
        body: &B,
    ) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .post(self.url(op.path()))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(%op, error = %e, "auth request failed to send");
                GatewayError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| op.fallback_message().to_string());
            tracing::debug!(%op, %status, %message, "auth request rejected");
            return Err(GatewayError::Rejected(message));
        }

        tracing::debug!(%op, %status, "auth request succeeded");
        Ok(bytes.to_vec())
    }

    async fn post_for<B: Serialize, T: DeserializeOwned>(
        &self,
        op: Operation,
        body: &B,
    ) -> Result<T, GatewayError> {
        let bytes = self.post(op, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::InvalidResponse(format!("{op}: {e}")))
    }
}

impl AuthGateway for HttpGateway {
    async fn login(&self, request: &LoginRequest) -> Result<TokenPair, GatewayError> {
        self.post_for(Operation::Login, request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), GatewayError> {
        self.post(Operation::Register, request).await.map(|_| ())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, GatewayError> {
        let body = RefreshRequest {
            refresh: refresh_token.to_string(),
        };
        self.post_for(Operation::Refresh, &body).await
    }
}
