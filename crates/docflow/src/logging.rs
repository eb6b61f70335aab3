//! Log and tracing initialisation.
//!
//! Library code logs through the `log` facade and opens `tracing` spans around
//! multi-request flows. [`init_logging`] installs one subscriber that receives
//! both.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Builds the filter: `RUST_LOG` when set and valid, otherwise `default`.
pub fn build_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Returns `false` when logging was already initialised, by this function or
/// by someone else.
pub fn init_logging(default_filter: &str, format: LogFormat) -> bool {
    if INITIALIZED.get().is_some() {
        return false;
    }

    let filter = build_filter(default_filter);
    let installed = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(true)),
        )
        .is_ok(),
        LogFormat::Json => tracing::subscriber::set_global_default(
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_current_span(true)),
        )
        .is_ok(),
    };
    if !installed {
        return false;
    }

    // Another `log` logger may already be installed.
    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::debug!("log records not bridged: {}", err);
    }

    let _ = INITIALIZED.set(());
    log::debug!("Logging initialised ({:?})", format);
    true
}
