//! Composition of the job source, worker pool and result collector.
//!
//! Control flows in one direction only:
//!
//! 1. Cancellation (or the end of the configured range) stops the
//!    [`JobSource`], which publishes [`PipelineState::Draining`] and closes the
//!    job queue.
//! 2. Workers evaluate whatever is still queued, then exit.
//! 3. Once the last worker has exited, the [`WorkerPool`] closes the result
//!    stream.
//! 4. The [`ResultCollector`] drains the stream, publishes
//!    [`PipelineState::Terminated`] and produces the [`Report`].

use crate::{
    Collected, JobSource, PipelineConfig, PipelineCounters, PipelineState, PoolSummary, Predicate,
    QueueStatus, Report, Result, ResultCollector, ResultSink, SourceSummary, StopReason,
    WorkerPool, job_queue, state::StatePublisher,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::{CancellationToken, DropGuard};

/// A configured, not yet started, pipeline run.
///
/// # Example
/// ```
/// use primeflow::{Pipeline, PipelineConfig, Report, is_prime};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = PipelineConfig::default().with_limit(Some(20)).with_num_workers(4);
/// let outcome = Pipeline::new(config, is_prime)?
///     .with_sink(Vec::new())
///     .run()
///     .await?;
///
/// let mut primes = outcome.sink;
/// primes.sort_unstable();
/// assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19]);
/// assert_eq!(outcome.report, Report::TotalMatches { matches: 8 });
/// # Ok::<(), primeflow::Error>(())
/// # }).unwrap();
/// ```
pub struct Pipeline<P, S = ()> {
    config: PipelineConfig,
    predicate: Arc<P>,
    sink: S,
    token: CancellationToken,
}

impl<P> Pipeline<P>
where
    P: Predicate,
{
    /// Validates `config` and prepares a run that discards matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration is unusable.
    pub fn new(config: PipelineConfig, predicate: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            predicate: Arc::new(predicate),
            sink: (),
            token: CancellationToken::new(),
        })
    }
}

impl<P, S> Pipeline<P, S>
where
    P: Predicate,
    S: ResultSink,
{
    /// Replaces the sink that receives each match in arrival order.
    pub fn with_sink<T>(self, sink: T) -> Pipeline<P, T>
    where
        T: ResultSink,
    {
        Pipeline {
            config: self.config,
            predicate: self.predicate,
            sink,
            token: self.token,
        }
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The token that stops this run. Hand it to a
    /// [`ShutdownCoordinator`](crate::ShutdownCoordinator).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Starts every stage on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(self) -> PipelineHandle<S> {
        let Self {
            config,
            predicate,
            sink,
            token,
        } = self;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting pipeline with {} workers (queue capacity {}, milestone {})",
            config.num_workers,
            config.queue_capacity,
            config.milestone_target
        );

        let start = Instant::now();
        let counters = Arc::new(PipelineCounters::default());
        let (publisher, state) = StatePublisher::new();
        let publisher = Arc::new(publisher);

        let (jobs_tx, jobs_rx) = job_queue(config.queue_capacity);
        let queue = jobs_tx.status();
        let (results_tx, results_rx) = mpsc::channel(config.result_buffer);

        let collector = tokio::spawn(
            ResultCollector::new(results_rx, config.milestone_target, start, sink)
                .with_state(Arc::clone(&publisher))
                .run(),
        );

        let pool = WorkerPool::spawn(
            config.num_workers,
            &jobs_rx,
            results_tx,
            predicate,
            &counters,
        );
        // Workers hold the only receivers from here on.
        drop(jobs_rx);
        let pool = tokio::spawn(pool.join());

        let source = tokio::spawn(
            JobSource::new(jobs_tx, token.clone())
                .with_limit(config.limit)
                .with_progress_interval(config.progress_interval)
                .with_counters(Arc::clone(&counters))
                .with_state(publisher)
                .run(),
        );

        PipelineHandle {
            source,
            pool,
            collector,
            state,
            counters,
            queue,
            guard: token.clone().drop_guard(),
            token,
            start,
        }
    }

    /// Starts the pipeline and waits for it to terminate.
    ///
    /// # Errors
    ///
    /// See [`PipelineHandle::join`].
    pub async fn run(self) -> Result<PipelineOutcome<S>> {
        self.spawn().join().await
    }
}

/// Everything a finished run reports.
#[derive(Debug)]
pub struct PipelineOutcome<S> {
    /// Milestone time if it was reached, total matches otherwise.
    pub report: Report,
    pub matches: u64,
    /// Candidates accepted by the job queue (`0..submitted`).
    pub submitted: u64,
    pub evaluated: u64,
    pub skipped: u64,
    pub failed_workers: usize,
    pub stop_reason: StopReason,
    /// Wall-clock time from start to termination.
    pub elapsed: Duration,
    pub sink: S,
}

impl<S> PipelineOutcome<S> {
    fn assemble(
        source: SourceSummary,
        pool: PoolSummary,
        collected: Collected<S>,
        elapsed: Duration,
    ) -> Self {
        Self {
            report: collected.report,
            matches: collected.matches,
            submitted: source.submitted,
            evaluated: pool.evaluated,
            skipped: pool.skipped,
            failed_workers: pool.failed_workers,
            stop_reason: source.stop_reason,
            elapsed,
            sink: collected.sink,
        }
    }
}

/// A running pipeline.
///
/// Dropping the handle before [`join`](Self::join) completes cancels the run,
/// so the stages drain and exit instead of running on detached.
pub struct PipelineHandle<S> {
    source: JoinHandle<SourceSummary>,
    pool: JoinHandle<PoolSummary>,
    collector: JoinHandle<Collected<S>>,
    state: watch::Receiver<PipelineState>,
    counters: Arc<PipelineCounters>,
    queue: QueueStatus,
    token: CancellationToken,
    guard: DropGuard,
    start: Instant,
}

impl<S> PipelineHandle<S> {
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// A watcher notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    pub const fn counters(&self) -> &Arc<PipelineCounters> {
        &self.counters
    }

    pub const fn queue_status(&self) -> &QueueStatus {
        &self.queue
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for all stages to finish.
    ///
    /// Returns once the result stream has been drained, which requires the
    /// source to stop first. An unbounded run therefore only completes after
    /// cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`](crate::Error::Task) if the source, the pool
    /// barrier or the collector task panicked.
    pub async fn join(self) -> Result<PipelineOutcome<S>> {
        let Self {
            source,
            pool,
            collector,
            guard,
            start,
            ..
        } = self;

        // The guard stays armed while awaiting: dropping this future cancels.
        let source = source.await?;
        let pool = pool.await?;
        let collected = collector.await?;
        guard.disarm();
        let outcome = PipelineOutcome::assemble(source, pool, collected, start.elapsed());

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Pipeline terminated ({}): {} submitted, {} evaluated, {} skipped, {} matches in {:?}",
            outcome.stop_reason,
            outcome.submitted,
            outcome.evaluated,
            outcome.skipped,
            outcome.matches,
            outcome.elapsed
        );

        Ok(outcome)
    }
}
