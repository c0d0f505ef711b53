//! The token pair's home in durable storage.

use tokenkeep_protocol::TokenPair;

use crate::{StorageBackend, StoreError};

/// Key the access token is stored under.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key the refresh token is stored under.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Persists a [`TokenPair`] in a [`StorageBackend`].
///
/// The two tokens live under [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`]. They can be read individually because a store
/// left behind by an older session may hold one without the other; the
/// session layer decides what that means.
///
/// Operations are idempotent: [`save`](Self::save) overwrites wholesale
/// and [`clear`](Self::clear) on an empty store does nothing.
#[derive(Debug, Clone)]
pub struct TokenStore<B> {
    backend: B,
}

impl<B: StorageBackend> TokenStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the stored pair, or `None` unless both halves are present.
    pub fn load(&self) -> Result<Option<TokenPair>, StoreError> {
        match (self.access_token()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Ok(Some(TokenPair { access, refresh })),
            _ => Ok(None),
        }
    }

    /// The stored access token, if any.
    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(ACCESS_TOKEN_KEY)
    }

    /// The stored refresh token, if any.
    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(REFRESH_TOKEN_KEY)
    }

    /// Replaces whatever is stored with `pair`.
    pub fn save(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.backend.set(ACCESS_TOKEN_KEY, &pair.access)?;
        self.backend.set(REFRESH_TOKEN_KEY, &pair.refresh)?;
        Ok(())
    }

    /// Removes both tokens.
    ///
    /// Returns `true` if anything was actually removed. Keys that are
    /// already absent are not touched, so clearing an empty store never
    /// writes to the backend.
    pub fn clear(&self) -> Result<bool, StoreError> {
        let mut removed = false;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if self.backend.get(key)?.is_some() {
                self.backend.remove(key)?;
                removed = true;
            }
        }
        if removed {
            tracing::debug!("stored tokens cleared");
        }
        Ok(removed)
    }
}
