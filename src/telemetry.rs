//! Tracing subscriber setup.
//!
//! The packaging code only emits `tracing` events. Processes that embed it
//! call [`init_tracing`] once at startup, or build a [`dispatch`] and hand it
//! to a single `PackagingUtility`.

use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build a subscriber from `cfg`. `RUST_LOG` overrides the configured level.
pub fn dispatch(cfg: &LoggingConfig) -> Result<Dispatch> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)
            .with_context(|| format!("invalid log level: {}", cfg.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let dispatch = if cfg.json {
        Dispatch::new(builder.json().finish())
    } else {
        Dispatch::new(builder.finish())
    };
    Ok(dispatch)
}

/// Install the configured subscriber as the process-wide default.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<()> {
    let dispatch = dispatch(cfg)?;
    tracing::dispatcher::set_global_default(dispatch)
        .context("failed to install tracing subscriber")
}
