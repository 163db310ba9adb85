#![doc = include_str!("../README.md")]

mod config;
mod sink;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, CliArgs};
use primeflow::{Pipeline, ShutdownCoordinator, SignalListener, is_prime};
use sink::{PrimePrinter, format_report};
use telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry(config.log_format)?;

    // Register signal handlers before any pipeline task exists so a missing
    // signal subsystem aborts startup instead of leaving an unstoppable run.
    let listener = SignalListener::install().context("failed to install interrupt handlers")?;

    log_startup_info(&config);

    let pipeline = Pipeline::new(config.pipeline, is_prime)?
        .with_sink(PrimePrinter::new(config.quiet));
    let coordinator =
        tokio::spawn(ShutdownCoordinator::new(pipeline.cancellation_token()).run(listener));

    let outcome = pipeline.run().await;
    // The listener never runs dry on its own.
    coordinator.abort();
    let outcome = outcome?;

    let report = format_report(&outcome.report);
    #[cfg(feature = "tracing")]
    tracing::info!("{report}");
    println!("{report}");

    Ok(())
}

fn log_startup_info(_config: &AppConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting primeflow with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting primeflow with {} workers",
            _config.pipeline.num_workers
        );
    }
}
