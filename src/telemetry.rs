//! Tracing initialization for binaries and tests.
//!
//! Console logging with an environment-driven filter. Library code only emits
//! `tracing` events; hosts decide whether and how to subscribe.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize console tracing.
///
/// Honors `RUST_LOG`; defaults to INFO when unset.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
