use core::fmt;
use portable_atomic::{AtomicU64, AtomicUsize, Ordering};

/// A single integer flowing through the pipeline awaiting evaluation.
///
/// Candidates are generated in strictly increasing order starting at `0` and
/// are moved (never shared) from stage to stage.
pub type Candidate = i64;

/// Why the job source stopped producing candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The cancellation token was triggered.
    Cancelled,
    /// The configured candidate range was fully submitted.
    Exhausted,
    /// Every worker went away before the source finished; nothing can consume
    /// further candidates.
    WorkersGone,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::WorkersGone => write!(f, "workers gone"),
        }
    }
}

/// Live counters shared by every pipeline stage.
///
/// Each counter has a single writer stage; readers may sample them at any
/// time. Two counters read back to back are not a consistent snapshot.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    submitted: AtomicU64,
    dequeued: AtomicU64,
    evaluated: AtomicU64,
    matched: AtomicU64,
    skipped: AtomicU64,
    live_workers: AtomicUsize,
}

impl PipelineCounters {
    /// Candidates accepted by the job queue.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    /// Candidates taken off the job queue by a worker.
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Acquire)
    }

    /// Candidates the predicate returned a verdict for.
    pub fn evaluated(&self) -> u64 {
        self.evaluated.load(Ordering::Acquire)
    }

    /// Candidates forwarded to the result stream.
    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Acquire)
    }

    /// Candidates dropped because the predicate failed or panicked.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }

    /// Workers that have started and not yet exited.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_evaluated(&self) {
        self.evaluated.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn worker_started(&self) {
        self.live_workers.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn worker_stopped(&self) {
        self.live_workers.fetch_sub(1, Ordering::AcqRel);
    }
}
