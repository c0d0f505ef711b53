//! Wire types and token decoding for Tokenkeep.
//!
//! This crate defines what travels between the client and the auth API,
//! and how a bearer token's embedded claims are read:
//!
//! - **Types** ([`TokenPair`], [`Identity`], [`Claims`], request and
//!   response bodies): the JSON shapes exchanged with the server.
//! - **Codec** ([`decode`]): reads the claims out of an access token
//!   without touching the network.
//! - **Validation** ([`LoginRequest::validate`],
//!   [`RegisterRequest::validate`]): the form rules applied before a
//!   credential is ever sent.
//! - **Errors** ([`DecodeError`], [`ValidationError`]).
//!
//! # Architecture
//!
//! ```text
//! Store / Gateway (bytes, HTTP) → Protocol (TokenPair, Claims) → Session (state)
//! ```

mod codec;
mod error;
mod types;
mod validate;

pub use codec::{decode, now_secs};
pub use error::{DecodeError, ValidationError};
pub use types::{
    Claims, ErrorBody, Identity, LoginRequest, RefreshRequest,
    RegisterRequest, TokenPair,
};
pub use validate::{MIN_PASSWORD_LEN, MIN_USERNAME_LEN};
