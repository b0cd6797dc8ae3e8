//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides `default_level`
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
