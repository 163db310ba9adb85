//! The job source: produces candidates `0, 1, 2, …` into the job queue.

use crate::{
    Candidate, JobSender, PipelineCounters, PipelineState, StopReason, state::StatePublisher,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the job source did before it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSummary {
    /// Candidates accepted by the queue. These are exactly `0..submitted`.
    pub submitted: u64,
    pub stop_reason: StopReason,
}

/// Generates strictly increasing candidates until cancelled or exhausted.
///
/// The source is the only owner of the queue's sending half. When it stops,
/// for whatever reason, it closes the queue; that closure is the only signal
/// workers get that no more candidates will arrive.
pub struct JobSource {
    tx: JobSender,
    token: CancellationToken,
    limit: Option<Candidate>,
    progress_interval: u64,
    counters: Arc<PipelineCounters>,
    state: Option<Arc<StatePublisher>>,
}

impl JobSource {
    /// Creates a source feeding `tx` until `token` is cancelled.
    pub fn new(tx: JobSender, token: CancellationToken) -> Self {
        Self {
            tx,
            token,
            limit: None,
            progress_interval: crate::DEFAULT_PROGRESS_INTERVAL,
            counters: Arc::default(),
            state: None,
        }
    }

    /// Stops on its own after submitting `[0, limit)`.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<Candidate>) -> Self {
        self.limit = limit;
        self
    }

    /// Emits a progress event every `interval` submissions. Zero disables
    /// progress events.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn with_counters(mut self, counters: Arc<PipelineCounters>) -> Self {
        self.counters = counters;
        self
    }

    #[must_use]
    pub(crate) fn with_state(mut self, state: Arc<StatePublisher>) -> Self {
        self.state = Some(state);
        self
    }

    /// Runs the source to completion.
    ///
    /// Each enqueue attempt is raced against cancellation, so a source blocked
    /// on a full queue still stops promptly. Cancellation is checked first
    /// when both are ready.
    pub async fn run(self) -> SourceSummary {
        let Self {
            tx,
            token,
            limit,
            progress_interval,
            counters,
            state,
        } = self;

        let mut next: Candidate = 0;
        let mut submitted: u64 = 0;

        let stop_reason = loop {
            if limit.is_some_and(|limit| next >= limit) {
                break StopReason::Exhausted;
            }

            tokio::select! {
                biased;
                () = token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Shutting down job submission after {submitted} candidates");
                    break StopReason::Cancelled;
                }
                res = tx.send(next) => {
                    if res.is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Job queue has no workers left; stopping submission");
                        break StopReason::WorkersGone;
                    }

                    submitted += 1;
                    counters.record_submitted();
                    if progress_interval > 0 && submitted % progress_interval == 0 {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Jobs submitted: {submitted}");
                    }

                    match next.checked_add(1) {
                        Some(n) => next = n,
                        None => break StopReason::Exhausted,
                    }
                }
            }
        };

        // Publish before closing so no observer can see the result stream end
        // while the pipeline still reports `Running`.
        if let Some(state) = &state {
            state.advance(PipelineState::Draining);
        }
        tx.close();

        #[cfg(feature = "tracing")]
        tracing::debug!("Job queue closed ({stop_reason})");

        SourceSummary {
            submitted,
            stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueueState, job_queue};
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn limit_submits_range_and_closes() {
        let (tx, rx) = job_queue(16);
        let status = tx.status();
        let summary = JobSource::new(tx, CancellationToken::new())
            .with_limit(Some(10))
            .run()
            .await;

        assert_eq!(summary.submitted, 10);
        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(status.state(), QueueState::Closed);

        let mut seen = Vec::new();
        while let Some(n) = rx.recv().await {
            seen.push(n);
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn zero_limit_submits_nothing() {
        let (tx, rx) = job_queue(4);
        let summary = JobSource::new(tx, CancellationToken::new())
            .with_limit(Some(0))
            .run()
            .await;

        assert_eq!(summary.submitted, 0);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn pre_cancelled_source_submits_nothing() {
        let (tx, rx) = job_queue(4);
        let token = CancellationToken::new();
        token.cancel();

        let summary = JobSource::new(tx, token).run().await;
        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_unblocks_a_full_queue() {
        let (tx, rx) = job_queue(3);
        let token = CancellationToken::new();
        let counters = Arc::new(PipelineCounters::default());
        let handle = tokio::spawn(
            JobSource::new(tx, token.clone())
                .with_counters(Arc::clone(&counters))
                .run(),
        );

        // Nobody is receiving, so the source parks on the fourth send.
        while counters.submitted() < 3 {
            tokio::task::yield_now().await;
        }
        token.cancel();

        let summary = timeout(Duration::from_secs(1), handle)
            .await
            .expect("source ignored cancellation while blocked")
            .unwrap();
        assert_eq!(summary.submitted, 3);
        assert_eq!(summary.stop_reason, StopReason::Cancelled);

        let mut drained = Vec::new();
        while let Some(n) = rx.recv().await {
            drained.push(n);
        }
        assert_eq!(drained, [0, 1, 2]);
    }

    #[tokio::test]
    async fn summary_counts_only_this_run() {
        let counters = Arc::new(PipelineCounters::default());
        for _ in 0..5 {
            counters.record_submitted();
        }

        let (tx, rx) = job_queue(8);
        let summary = JobSource::new(tx, CancellationToken::new())
            .with_limit(Some(3))
            .with_counters(Arc::clone(&counters))
            .run()
            .await;

        assert_eq!(summary.submitted, 3);
        assert_eq!(counters.submitted(), 8);

        let mut seen = Vec::new();
        while let Some(n) = rx.recv().await {
            seen.push(n);
        }
        assert_eq!(seen, [0, 1, 2]);
    }

    #[tokio::test]
    async fn dropped_receivers_stop_the_source() {
        let (tx, rx) = job_queue(1);
        drop(rx);

        let summary = JobSource::new(tx, CancellationToken::new()).run().await;
        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.stop_reason, StopReason::WorkersGone);
    }

    #[tokio::test]
    async fn source_publishes_draining() {
        let (publisher, state_rx) = StatePublisher::new();
        let (tx, _rx) = job_queue(4);
        JobSource::new(tx, CancellationToken::new())
            .with_limit(Some(2))
            .with_state(Arc::new(publisher))
            .run()
            .await;

        assert_eq!(*state_rx.borrow(), PipelineState::Draining);
    }
}
