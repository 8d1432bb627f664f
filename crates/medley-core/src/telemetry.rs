//! Tracing initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with an env-filter.
///
/// Honors `RUST_LOG`; defaults to `medley=info` otherwise. Safe to call once
/// per process; subsequent calls return an error from the subscriber registry.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "medley=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
