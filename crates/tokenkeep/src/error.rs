//! Unified error type for Tokenkeep.

use tokenkeep_gateway::GatewayError;
use tokenkeep_protocol::{DecodeError, ValidationError};
use tokenkeep_session::SessionError;
use tokenkeep_store::StoreError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tokenkeep` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant lets `?` convert automatically.
#[derive(Debug, thiserror::Error)]
pub enum TokenkeepError {
    /// A token could not be read.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A credential was rejected before sending.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Durable token storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The auth server refused or couldn't be reached.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A session operation failed or wasn't accepted.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The environment didn't describe a usable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
