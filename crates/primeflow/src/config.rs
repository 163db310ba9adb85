use crate::{Candidate, Error, Result};
use tokio::sync::Semaphore;

/// Largest capacity a bounded channel accepts.
pub const MAX_CHANNEL_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Default capacity of the bounded job queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
/// Default result count at which elapsed time is captured.
pub const DEFAULT_MILESTONE_TARGET: u64 = 1_000_000;
/// Default number of submissions between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;
/// Default capacity of the result stream. `1` is the closest a Tokio channel
/// gets to unbuffered.
pub const DEFAULT_RESULT_BUFFER: usize = 1;

/// Tunables for a single pipeline run.
///
/// Each field has a direct, observable effect:
///
/// - `queue_capacity`: how far the job source may run ahead of the workers
///   before it blocks (backpressure threshold).
/// - `num_workers`: degree of parallel evaluation. Defaults to the number of
///   available CPUs.
/// - `milestone_target`: the result count at which elapsed time is captured.
/// - `progress_interval`: submissions between `debug` progress events.
/// - `result_buffer`: capacity of the result stream between workers and the
///   collector.
/// - `limit`: when set, candidates `[0, limit)` are generated and the run
///   ends on its own. When unset, generation continues until cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub num_workers: usize,
    pub milestone_target: u64,
    pub progress_interval: u64,
    pub result_buffer: usize,
    pub limit: Option<Candidate>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            num_workers: default_num_workers(),
            milestone_target: DEFAULT_MILESTONE_TARGET,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            result_buffer: DEFAULT_RESULT_BUFFER,
            limit: None,
        }
    }
}

/// Available hardware parallelism, never less than one.
pub fn default_num_workers() -> usize {
    num_cpus::get().max(1)
}

impl PipelineConfig {
    #[must_use]
    pub const fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub const fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    #[must_use]
    pub const fn with_milestone_target(mut self, milestone_target: u64) -> Self {
        self.milestone_target = milestone_target;
        self
    }

    #[must_use]
    pub const fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    #[must_use]
    pub const fn with_result_buffer(mut self, result_buffer: usize) -> Self {
        self.result_buffer = result_buffer;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: Option<Candidate>) -> Self {
        self.limit = limit;
        self
    }

    /// Checks every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any capacity, the worker count, the
    /// milestone target or the progress interval is zero, if a capacity is
    /// above [`MAX_CHANNEL_CAPACITY`], or if `limit` is negative.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.queue_capacity == 0 {
            "queue_capacity must be greater than 0"
        } else if self.queue_capacity > MAX_CHANNEL_CAPACITY {
            "queue_capacity exceeds the maximum channel capacity"
        } else if self.num_workers == 0 {
            "num_workers must be greater than 0"
        } else if self.milestone_target == 0 {
            "milestone_target must be greater than 0"
        } else if self.progress_interval == 0 {
            "progress_interval must be greater than 0"
        } else if self.result_buffer == 0 {
            "result_buffer must be greater than 0"
        } else if self.result_buffer > MAX_CHANNEL_CAPACITY {
            "result_buffer exceeds the maximum channel capacity"
        } else if self.limit.is_some_and(|limit| limit < 0) {
            "limit must not be negative"
        } else {
            return Ok(());
        };

        Err(Error::InvalidConfig {
            reason: reason.to_string(),
        })
    }
}
