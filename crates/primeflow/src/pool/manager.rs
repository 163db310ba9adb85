//! Worker pool lifecycle.
//!
//! This module defines [`WorkerPool`], which spawns a fixed number of
//! [`worker_loop`] tasks over one shared job queue and funnels their matches
//! into a single result stream.
//!
//! The result stream is closed exactly once, by [`WorkerPool::join`], after
//! every worker task has finished. No individual worker ever closes it, so no
//! worker can be left holding a pending send on a closed stream.

use crate::{Candidate, JobReceiver, PipelineCounters, Predicate, WorkerSummary, worker_loop};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

/// Totals across every worker in the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub workers: usize,
    pub evaluated: u64,
    pub matched: u64,
    pub skipped: u64,
    /// Worker tasks that panicked or were aborted instead of exiting.
    pub failed_workers: usize,
}

impl PoolSummary {
    fn absorb(&mut self, worker: WorkerSummary) {
        self.evaluated += worker.evaluated;
        self.matched += worker.matched;
        self.skipped += worker.skipped;
    }
}

/// A fixed-size set of workers sharing one job queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerSummary>>,
    // Held until every worker has exited; dropping it closes the stream.
    results: mpsc::Sender<Candidate>,
}

impl WorkerPool {
    /// Spawns `size` workers on the current Tokio runtime.
    ///
    /// Each worker receives a clone of `jobs`, a clone of `results` and a
    /// shared handle to `predicate`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<P>(
        size: usize,
        jobs: &JobReceiver,
        results: mpsc::Sender<Candidate>,
        predicate: Arc<P>,
        counters: &Arc<PipelineCounters>,
    ) -> Self
    where
        P: Predicate,
    {
        let handles = (0..size)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    jobs.clone(),
                    results.clone(),
                    Arc::clone(&predicate),
                    Arc::clone(counters),
                ))
            })
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawned {size} workers");

        Self { handles, results }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit, then closes the result stream.
    ///
    /// Workers exit once the job queue is closed and drained. A worker task
    /// that panics is counted in [`PoolSummary::failed_workers`] and does not
    /// prevent the stream from closing.
    pub async fn join(self) -> PoolSummary {
        let Self { handles, results } = self;
        let mut summary = PoolSummary {
            workers: handles.len(),
            ..PoolSummary::default()
        };

        for (_worker_id, outcome) in futures::future::join_all(handles)
            .await
            .into_iter()
            .enumerate()
        {
            match outcome {
                Ok(worker) => summary.absorb(worker),
                Err(_e) => {
                    summary.failed_workers += 1;
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {_worker_id} did not exit cleanly: {_e}");
                }
            }
        }

        // Every worker's sender is gone; this is the last one.
        drop(results);

        #[cfg(feature = "tracing")]
        tracing::debug!("All workers exited; result stream closed");

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{is_prime, job_queue};
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn primes_below(limit: Candidate, workers: usize) -> (BTreeSet<Candidate>, PoolSummary) {
        let (jobs_tx, jobs_rx) = job_queue(16);
        let (results_tx, mut results_rx) = mpsc::channel(1);
        let counters = Arc::new(PipelineCounters::default());
        let pool = WorkerPool::spawn(
            workers,
            &jobs_rx,
            results_tx,
            Arc::new(is_prime),
            &counters,
        );
        drop(jobs_rx);
        assert_eq!(pool.size(), workers);

        let feeder = tokio::spawn(async move {
            for n in 0..limit {
                jobs_tx.send(n).await.unwrap();
            }
            jobs_tx.close();
        });
        let joined = tokio::spawn(pool.join());

        let mut found = BTreeSet::new();
        while let Some(p) = results_rx.recv().await {
            assert!(found.insert(p), "{p} delivered twice");
        }
        feeder.await.unwrap();
        (found, joined.await.unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_size_does_not_change_the_result_set() {
        let expected: BTreeSet<Candidate> = (0..2_000).filter(|&n| is_prime(n)).collect();

        for workers in [1, 2, 4, 8] {
            let (found, summary) = primes_below(2_000, workers).await;
            assert_eq!(found, expected, "{workers} workers");
            assert_eq!(summary.workers, workers);
            assert_eq!(summary.evaluated, 2_000);
            assert_eq!(summary.matched, expected.len() as u64);
            assert_eq!(summary.failed_workers, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn result_stream_closes_only_after_every_worker_exits() {
        let (jobs_tx, jobs_rx) = job_queue(8);
        let (results_tx, mut results_rx) = mpsc::channel(1);
        let counters = Arc::new(PipelineCounters::default());
        let slow = |n: Candidate| {
            std::thread::sleep(Duration::from_millis(2));
            n % 2 == 0
        };
        let pool = WorkerPool::spawn(4, &jobs_rx, results_tx, Arc::new(slow), &counters);
        drop(jobs_rx);

        for n in 0..8 {
            jobs_tx.send(n).await.unwrap();
        }
        jobs_tx.close();
        let joined = tokio::spawn(pool.join());

        let mut count = 0;
        while results_rx.recv().await.is_some() {
            count += 1;
        }
        // The stream only ends once the barrier has passed.
        assert_eq!(counters.live_workers(), 0);
        assert_eq!(count, 4);

        let summary = timeout(Duration::from_secs(1), joined)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.matched, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_predicate_does_not_stop_the_pool() {
        let (found, summary) = {
            let (jobs_tx, jobs_rx) = job_queue(4);
            let (results_tx, mut results_rx) = mpsc::channel(4);
            let counters = Arc::new(PipelineCounters::default());
            let flaky = |n: Candidate| -> bool {
                assert!(n % 5 != 0, "multiple of five");
                true
            };
            let pool = WorkerPool::spawn(2, &jobs_rx, results_tx, Arc::new(flaky), &counters);
            drop(jobs_rx);

            let feeder = tokio::spawn(async move {
                for n in 1..=20 {
                    jobs_tx.send(n).await.unwrap();
                }
            });
            let joined = tokio::spawn(pool.join());

            let mut found = BTreeSet::new();
            while let Some(n) = results_rx.recv().await {
                found.insert(n);
            }
            feeder.await.unwrap();
            (found, joined.await.unwrap())
        };

        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.matched, 16);
        assert_eq!(summary.failed_workers, 0);
        assert!(found.iter().all(|n| n % 5 != 0));
    }
}
