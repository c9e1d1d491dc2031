//! Tracing subscriber bootstrap.

use anyhow::Context;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber described by `settings`.
///
/// `RUST_LOG` wins over the configured filter when present.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .with_context(|| format!("invalid log filter '{}'", settings.filter))?;

    let installed = match settings.log_format {
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };

    // Another subscriber (tests, embedding binaries) may already be installed.
    if installed.is_err() {
        tracing::debug!(target: "shelf-telemetry", "tracing subscriber already installed");
        return Ok(());
    }

    tracing::info!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        filter = %settings.filter,
        "telemetry initialized"
    );
    Ok(())
}
