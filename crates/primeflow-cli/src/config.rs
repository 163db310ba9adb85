use anyhow::bail;
use clap::{Parser, ValueEnum};
use primeflow::{
    DEFAULT_MILESTONE_TARGET, DEFAULT_PROGRESS_INTERVAL, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RESULT_BUFFER, PipelineConfig, default_num_workers,
};

/// Log output style on stderr.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Runtime configuration for the `primeflow` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults that reproduce the classic
/// "time to the first million primes" run.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "primeflow",
    version,
    about = "Streams primes through a cancellable worker pool until interrupted"
)]
pub struct CliArgs {
    /// Capacity of the bounded job queue.
    ///
    /// The job source blocks once this many candidates are waiting, so the
    /// generator never runs further ahead of the workers than this.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Number of workers evaluating candidates in parallel.
    ///
    /// Defaults to the number of available CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Prime count at which the elapsed time is captured and reported.
    ///
    /// Environment variable: `MILESTONE_TARGET`
    #[arg(long, env = "MILESTONE_TARGET", default_value_t = DEFAULT_MILESTONE_TARGET)]
    pub milestone_target: u64,

    /// Number of submitted candidates between progress log events.
    ///
    /// Environment variable: `PROGRESS_INTERVAL`
    #[arg(long, env = "PROGRESS_INTERVAL", default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Capacity of the result stream between workers and the printer.
    ///
    /// Environment variable: `RESULT_BUFFER`
    #[arg(long, env = "RESULT_BUFFER", default_value_t = DEFAULT_RESULT_BUFFER)]
    pub result_buffer: usize,

    /// Stop on its own after testing candidates `[0, LIMIT)`.
    ///
    /// Without a limit the run continues until interrupted.
    ///
    /// Environment variable: `LIMIT`
    #[arg(long, env = "LIMIT")]
    pub limit: Option<i64>,

    /// Do not print each prime; only the final report.
    ///
    /// Environment variable: `QUIET`
    #[arg(short, long, env = "QUIET", default_value_t = false)]
    pub quiet: bool,

    /// Log output style.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub quiet: bool,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let num_workers = args.num_workers.unwrap_or_else(default_num_workers);

        if num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }

        let pipeline = PipelineConfig {
            queue_capacity: args.queue_capacity,
            num_workers,
            milestone_target: args.milestone_target,
            progress_interval: args.progress_interval,
            result_buffer: args.result_buffer,
            limit: args.limit,
        };
        pipeline.validate()?;

        Ok(Self {
            pipeline,
            quiet: args.quiet,
            log_format: args.log_format,
        })
    }
}
