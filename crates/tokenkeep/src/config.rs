//! Runtime configuration, read from the environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `TOKENKEEP_ENV` | `development` or `production` | `development` |
//! | `TOKENKEEP_BACKEND_URL` | auth API root | `http://127.0.0.1:8000` in development, required in production |
//! | `TOKENKEEP_STORAGE` | token file path | `./tokenkeep-session.json` |

use std::fmt;
use std::path::PathBuf;

/// Selects the environment.
pub const ENV_VAR: &str = "TOKENKEEP_ENV";
/// Overrides the auth API root.
pub const BACKEND_URL_VAR: &str = "TOKENKEEP_BACKEND_URL";
/// Overrides where tokens are stored.
pub const STORAGE_VAR: &str = "TOKENKEEP_STORAGE";

/// The auth API root used in development when nothing else is set.
pub const DEVELOPMENT_BACKEND_URL: &str = "http://127.0.0.1:8000";
/// Where tokens are stored when nothing else is set.
pub const DEFAULT_STORAGE_PATH: &str = "./tokenkeep-session.json";

/// Errors from reading the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Production has no default backend.
    #[error("TOKENKEEP_BACKEND_URL must be set in production")]
    MissingBackendUrl,
}

/// Which deployment this client is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parses a `TOKENKEEP_ENV` value. Anything unrecognized is
    /// development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => {
                tracing::debug!(value = other, "unknown environment, using development");
                Self::Development
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Where the client finds its auth server and keeps its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: Environment,
    /// Auth API root, without a trailing `/`.
    pub base_url: String,
    pub storage_path: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// [`ConfigError::MissingBackendUrl`] in production without
    /// `TOKENKEEP_BACKEND_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which plays the role of
    /// the environment.
    ///
    /// ```rust
    /// use tokenkeep::{Config, Environment};
    ///
    /// let config = Config::from_lookup(|key| match key {
    ///     "TOKENKEEP_ENV" => Some("production".into()),
    ///     "TOKENKEEP_BACKEND_URL" => Some("https://auth.example.com/".into()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.environment, Environment::Production);
    /// assert_eq!(config.base_url, "https://auth.example.com");
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = lookup(ENV_VAR)
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();

        let backend = lookup(BACKEND_URL_VAR).filter(|v| !v.trim().is_empty());
        let base_url = match (environment, backend) {
            (_, Some(url)) => url,
            (Environment::Development, None) => DEVELOPMENT_BACKEND_URL.to_string(),
            (Environment::Production, None) => return Err(ConfigError::MissingBackendUrl),
        };
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let storage_path = lookup(STORAGE_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);

        Ok(Self {
            environment,
            base_url,
            storage_path,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            base_url: DEVELOPMENT_BACKEND_URL.to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}
