//! Client session management for Tokenkeep.
//!
//! This crate decides whether the user is signed in:
//!
//! 1. **State machine** ([`SessionMachine`]): a pure transition table from
//!    [`Event`]s to [`Effect`]s over a [`SessionState`]
//! 2. **Driver** ([`SessionManager`]): runs the machine against a real
//!    [`AuthGateway`](tokenkeep_gateway::AuthGateway) and
//!    [`TokenStore`](tokenkeep_store::TokenStore)
//! 3. **Consumer interface**: a [`SessionProjection`] published through a
//!    `watch` channel, plus one-shot [`Notice`]s through a `broadcast`
//!    channel
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← reads the projection, reacts to notices
//!     ↕
//! Session Layer (this crate)  ← owns the session state
//!     ↕
//! Store / Gateway (below)  ← durable tokens, auth server calls
//! ```

mod error;
mod machine;
mod manager;
mod notice;
mod state;

pub use error::SessionError;
pub use machine::{Assessment, Effect, Event, SessionMachine, assess};
pub use manager::SessionManager;
pub use notice::{DiscardReason, Notice};
pub use state::{SessionProjection, SessionState, SubmissionKind, Ticket};
