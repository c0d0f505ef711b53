//! Durable token storage for Tokenkeep.
//!
//! Provides the [`StorageBackend`] trait, a plain string key-value store
//! that survives restarts, and [`TokenStore`], which keeps a
//! [`TokenPair`](tokenkeep_protocol::TokenPair) in a backend under two
//! fixed keys.
//!
//! # Feature Flags
//!
//! - `file` (default): [`FileStorage`], a JSON file backend

mod error;
#[cfg(feature = "file")]
mod file;
mod memory;
mod token_store;

pub use error::StoreError;
#[cfg(feature = "file")]
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use token_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};

/// A durable string key-value store.
///
/// This plays the role a browser's local storage plays for a web client:
/// small string values under well-known keys, synchronous access,
/// surviving a reload of the application.
///
/// Methods take `&self`; implementations that mutate use interior
/// mutability. Callers are expected to serialize writes themselves (the
/// session layer is the only writer).
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared handles delegate to the backend they point at.
impl<B: StorageBackend> StorageBackend for std::sync::Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}
