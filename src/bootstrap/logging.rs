//! Logging setup for the running process.
//!
//! The threshold comes from the `log_level` configuration option; the
//! standard `RUST_LOG` env var, when set, takes precedence through the env
//! filter.
use std::str::FromStr;
use std::sync::Once;

use depot_tracker_configuration::Configuration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes the global tracing subscriber once.
pub fn setup(config: &Configuration) {
    let level = config
        .log_level
        .as_deref()
        .map_or(LevelFilter::INFO, |value| {
            LevelFilter::from_str(value).unwrap_or(LevelFilter::INFO)
        });

    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        tracing_subscriber::fmt().with_env_filter(filter).init();

        tracing::info!("logging initialized");
    });
}
