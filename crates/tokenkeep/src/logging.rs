//! Log output for binaries built on Tokenkeep.
//!
//! The library crates only emit `tracing` events. Installing a subscriber
//! is left to the application; this is the one the demo uses.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a formatting subscriber filtered by `RUST_LOG`, or by
/// `default_directive` (e.g. `"tokenkeep=info,warn"`) when `RUST_LOG` is
/// unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
