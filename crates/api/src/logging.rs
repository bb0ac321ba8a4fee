//! Tracing initialisation

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global subscriber. `RUST_LOG` overrides the default
/// level; repeated initialisation (tests) is tolerated.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,plansync=debug"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
