use crate::{Candidate, Error, JobReceiver, PipelineCounters, Predicate, Result};
use core::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-worker tallies, returned when the worker exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub evaluated: u64,
    pub matched: u64,
    pub skipped: u64,
}

/// Worker task: pulls candidates from the job queue, evaluates them and
/// forwards matches to the result stream.
///
/// The loop ends only when the job queue is closed and drained, so every
/// candidate that made it into the queue is evaluated. Workers never look at
/// the cancellation token.
///
/// A candidate whose evaluation fails or panics is logged and skipped; the
/// worker moves on to the next one.
///
/// # Arguments
///
/// - `worker_id`: Identifier used in logs and the returned summary.
/// - `jobs`: Shared receiving half of the job queue.
/// - `results`: This worker's handle on the result stream. It is dropped when
///   the worker exits; the stream itself is closed by the
///   [`WorkerPool`](crate::WorkerPool).
/// - `predicate`: The test applied to each candidate.
/// - `counters`: Pipeline-wide counters.
pub async fn worker_loop<P>(
    worker_id: usize,
    jobs: JobReceiver,
    results: mpsc::Sender<Candidate>,
    predicate: Arc<P>,
    counters: Arc<PipelineCounters>,
) -> WorkerSummary
where
    P: Predicate,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    let _live = LiveWorker::new(&counters);
    let mut summary = WorkerSummary {
        worker_id,
        ..WorkerSummary::default()
    };
    let mut collector_gone = false;

    while let Some(candidate) = jobs.recv().await {
        counters.record_dequeued();

        match evaluate(predicate.as_ref(), candidate) {
            Ok(true) => {
                summary.evaluated += 1;
                counters.record_evaluated();

                // Keep draining even if the collector is gone so the source
                // never blocks on a queue nobody empties.
                if collector_gone {
                    continue;
                }
                if results.send(candidate).await.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {worker_id} lost the result stream at {candidate}");
                    collector_gone = true;
                    continue;
                }
                summary.matched += 1;
                counters.record_matched();
            }
            Ok(false) => {
                summary.evaluated += 1;
                counters.record_evaluated();
            }
            Err(_e) => {
                summary.skipped += 1;
                counters.record_skipped();
                #[cfg(feature = "tracing")]
                tracing::warn!("Worker {worker_id} skipped candidate: {_e}");
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");

    summary
}

/// Evaluates one candidate, turning a panic into an [`Error::Evaluation`].
pub(crate) fn evaluate<P>(predicate: &P, candidate: Candidate) -> Result<bool>
where
    P: Predicate + ?Sized,
{
    catch_unwind(AssertUnwindSafe(|| predicate.evaluate(candidate)))
        .unwrap_or_else(|payload| Err(Error::evaluation(candidate, panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("predicate panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("predicate panicked: {msg}")
    } else {
        "predicate panicked".to_string()
    }
}

/// Keeps [`PipelineCounters::live_workers`] accurate even if the worker
/// future is dropped mid-loop.
struct LiveWorker<'a> {
    counters: &'a PipelineCounters,
}

impl<'a> LiveWorker<'a> {
    fn new(counters: &'a PipelineCounters) -> Self {
        counters.worker_started();
        Self { counters }
    }
}

impl Drop for LiveWorker<'_> {
    fn drop(&mut self) {
        self.counters.worker_stopped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fallible, is_prime, job_queue};

    #[test]
    fn panics_become_evaluation_errors() {
        let boom = |n: Candidate| -> bool {
            assert!(n != 13, "thirteen");
            true
        };
        assert_eq!(evaluate(&boom, 12), Ok(true));
        match evaluate(&boom, 13) {
            Err(Error::Evaluation { candidate, reason }) => {
                assert_eq!(candidate, 13);
                assert!(reason.contains("thirteen"), "{reason}");
            }
            other => panic!("expected an evaluation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn worker_drains_queue_and_forwards_matches() {
        let (jobs_tx, jobs_rx) = job_queue(32);
        for n in 0..20 {
            jobs_tx.send(n).await.unwrap();
        }
        jobs_tx.close();

        let (results_tx, mut results_rx) = mpsc::channel(32);
        let counters = Arc::new(PipelineCounters::default());
        let summary = worker_loop(
            7,
            jobs_rx,
            results_tx,
            Arc::new(is_prime),
            Arc::clone(&counters),
        )
        .await;

        assert_eq!(summary.worker_id, 7);
        assert_eq!(summary.evaluated, 20);
        assert_eq!(summary.matched, 8);
        assert_eq!(counters.live_workers(), 0);

        let mut primes = Vec::new();
        while let Some(p) = results_rx.recv().await {
            primes.push(p);
        }
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19]);
    }

    #[tokio::test]
    async fn failing_candidates_are_skipped() {
        let (jobs_tx, jobs_rx) = job_queue(8);
        for n in 0..6 {
            jobs_tx.send(n).await.unwrap();
        }
        jobs_tx.close();

        let predicate = Fallible(|n: Candidate| {
            if n % 3 == 0 {
                Err(Error::evaluation(n, "multiple of three"))
            } else {
                Ok(true)
            }
        });
        let (results_tx, mut results_rx) = mpsc::channel(8);
        let counters = Arc::new(PipelineCounters::default());
        let summary = worker_loop(
            0,
            jobs_rx,
            results_tx,
            Arc::new(predicate),
            Arc::clone(&counters),
        )
        .await;

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.matched, 4);
        assert_eq!(counters.skipped(), 2);

        let mut forwarded = Vec::new();
        while let Some(n) = results_rx.recv().await {
            forwarded.push(n);
        }
        assert_eq!(forwarded, [1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn worker_keeps_draining_without_a_collector() {
        let (jobs_tx, jobs_rx) = job_queue(8);
        for n in 0..8 {
            jobs_tx.send(n).await.unwrap();
        }
        jobs_tx.close();

        let (results_tx, results_rx) = mpsc::channel(1);
        drop(results_rx);
        let counters = Arc::new(PipelineCounters::default());
        let summary = worker_loop(
            0,
            jobs_rx,
            results_tx,
            Arc::new(|_: Candidate| true),
            Arc::clone(&counters),
        )
        .await;

        assert_eq!(summary.evaluated, 8);
        assert_eq!(summary.matched, 0);
        assert_eq!(counters.dequeued(), 8);
    }
}
