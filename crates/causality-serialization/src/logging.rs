// Purpose: Tracing initialization for binaries and tests embedding the serialization layer

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

//-----------------------------------------------------------------------------
// Tracing Initialization
//-----------------------------------------------------------------------------

/// Initializes the tracing subscriber with configurable log level and output format.
///
/// # Arguments
///
/// * `log_level`: An optional directive string, e.g. "debug" or
///                "causality_serialization=trace,info". Defaults to "info".
///                `RUST_LOG` takes precedence when set.
/// * `json_output`: Whether to emit JSON lines instead of human-readable output.
///                  Defaults to `false`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(log_level: Option<&str>, json_output: Option<bool>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))?;

    let subscriber = Registry::default().with(env_filter);

    if json_output.unwrap_or(false) {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))?;
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_level(true);
        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))?;
    }

    Ok(())
}

/// Initialize test logging once per test binary
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = Registry::default()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().with_test_writer());
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
