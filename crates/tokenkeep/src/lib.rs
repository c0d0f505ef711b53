//! # Tokenkeep
//!
//! Client-side authentication session management.
//!
//! Tokenkeep keeps a user signed in across restarts: it stores the
//! access/refresh token pair, decides at startup whether the stored
//! session is still good, refreshes it when it isn't, and publishes a
//! read-only view of who is signed in for the rest of the application.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tokenkeep::prelude::*;
//!
//! # async fn run() -> Result<(), TokenkeepError> {
//! let session = SessionBuilder::new()
//!     .base_url("http://127.0.0.1:8000")
//!     .storage_path("./session.json")
//!     .start()
//!     .await?;
//!
//! let mut updates = session.subscribe();
//! session.login(LoginRequest::new("ada", "lovelace1")).await?;
//! assert!(updates.borrow_and_update().is_authenticated);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Crate | Layer |
//! |---|---|
//! | `tokenkeep-protocol` | wire types, token decoding, form rules |
//! | `tokenkeep-store` | durable token storage |
//! | `tokenkeep-gateway` | auth server calls |
//! | `tokenkeep-session` | the session state machine and its driver |

mod client;
mod config;
mod error;
mod logging;

pub use client::{Session, SessionBuilder};
pub use config::{
    BACKEND_URL_VAR, Config, ConfigError, DEFAULT_STORAGE_PATH, DEVELOPMENT_BACKEND_URL,
    ENV_VAR, Environment, STORAGE_VAR,
};
pub use error::TokenkeepError;
pub use logging::init_tracing;

pub use tokenkeep_gateway as gateway;
pub use tokenkeep_protocol as protocol;
pub use tokenkeep_session as session;
pub use tokenkeep_store as store;

/// Everything an application usually needs, in one import.
pub mod prelude {
    pub use crate::{Config, Environment, Session, SessionBuilder, TokenkeepError, init_tracing};
    pub use tokenkeep_gateway::{AuthGateway, GatewayError, HttpGateway};
    pub use tokenkeep_protocol::{Identity, LoginRequest, RegisterRequest, TokenPair};
    pub use tokenkeep_session::{
        DiscardReason, Notice, SessionError, SessionManager, SessionProjection,
    };
    pub use tokenkeep_store::{FileStorage, MemoryStorage, StorageBackend, TokenStore};
}
