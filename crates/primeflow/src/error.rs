//! Error types for the pipeline.
//!
//! The pipeline core is close to infallible: integer generation cannot fail
//! and channel operations only block or observe closure. What remains is
//! captured here:
//!
//! - `InvalidConfig`: a [`PipelineConfig`](crate::PipelineConfig) value is
//!   out of range.
//! - `Evaluation`: a predicate rejected a single candidate. Workers log and
//!   skip these; they never stop the pool.
//! - `QueueClosed`: a send was attempted after every receiver was dropped.
//! - `Signal`: the host interrupt subsystem could not be installed.
//! - `Task`: a spawned pipeline task panicked or was aborted.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the pipeline.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The predicate failed for one candidate.
    #[error("Evaluation of candidate {candidate} failed: {reason}")]
    Evaluation { candidate: i64, reason: String },

    /// The job queue has no remaining receivers.
    #[error("Job queue closed")]
    QueueClosed,

    /// Installing an interrupt handler failed.
    #[error("Signal error: {context}")]
    Signal { context: String },

    /// A pipeline task did not run to completion.
    #[error("Task error: {context}")]
    Task { context: String },
}

impl Error {
    /// Shorthand used by fallible predicates.
    pub fn evaluation(candidate: i64, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            candidate,
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        let context = if err.is_panic() {
            format!("task panicked: {err}")
        } else {
            format!("task cancelled: {err}")
        };
        Self::Task { context }
    }
}
