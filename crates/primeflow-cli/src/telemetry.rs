//! # Logging
//!
//! Logs are written to stderr through `tracing_subscriber::fmt`, leaving
//! stdout for primes and the final report.
//!
//! - Verbosity follows `RUST_LOG` and defaults to `info`. Submission progress
//!   is logged at `debug`.
//! - [`LogFormat`] picks between pretty, compact and JSON output.
//! - Library events are only emitted when the `tracing` feature is enabled
//!   (the default for this binary).

use crate::config::LogFormat;
use tracing_subscriber::{
    EnvFilter, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_target(false)
        .with_timer(ChronoLocal::rfc_3339())
        .with_file(true);

    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init()?,
        LogFormat::Compact => registry.with(layer.compact()).try_init()?,
        LogFormat::Json => registry.with(layer.json()).try_init()?,
    }

    Ok(())
}
