//! The bounded job queue between the job source and the worker pool.
//!
//! The queue has exactly one sending half, [`JobSender`], owned by the job
//! source, and any number of receiving halves, [`JobReceiver`], shared by the
//! workers. Its lifecycle is published as an explicit [`QueueState`]:
//!
//! - `Open`: the source may still send.
//! - `Closing`: the source has stopped producing; no new sends will start.
//! - `Closed`: the sending half is gone. Receivers drain what is buffered and
//!   then observe `None`.
//!
//! Only the sender moves the state forward. Because [`JobSender::close`]
//! consumes the sender, no send can be in flight when the channel closes.

use crate::{Candidate, Error, Result};
use portable_atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Lifecycle of the job queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum QueueState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl QueueState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Read-only view of the queue's lifecycle.
#[derive(Clone, Debug)]
pub struct QueueStatus {
    state: Arc<AtomicU8>,
}

impl QueueStatus {
    pub fn state(&self) -> QueueState {
        QueueState::from_raw(self.state.load(Ordering::Acquire))
    }
}

/// The single sending half of the job queue.
#[derive(Debug)]
pub struct JobSender {
    tx: Option<mpsc::Sender<Candidate>>,
    state: Arc<AtomicU8>,
}

impl JobSender {
    /// Enqueues a candidate, waiting while the queue is full.
    ///
    /// This future is cancel safe: dropping it before completion leaves the
    /// candidate unsent and the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if every [`JobReceiver`] has been
    /// dropped.
    pub async fn send(&self, candidate: Candidate) -> Result<()> {
        let Some(tx) = &self.tx else {
            return Err(Error::QueueClosed);
        };
        tx.send(candidate).await.map_err(|_| Error::QueueClosed)
    }

    /// Number of candidates currently buffered.
    pub fn queued(&self) -> usize {
        self.tx
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            state: Arc::clone(&self.state),
        }
    }

    /// Stops production and closes the queue.
    ///
    /// Workers keep receiving whatever is already buffered before they
    /// observe the closure.
    pub fn close(self) {
        drop(self);
    }

    fn shut(&mut self) {
        if self.tx.is_none() {
            return;
        }
        self.state
            .store(QueueState::Closing as u8, Ordering::Release);
        drop(self.tx.take());
        self.state.store(QueueState::Closed as u8, Ordering::Release);
    }
}

impl Drop for JobSender {
    fn drop(&mut self) {
        self.shut();
    }
}

/// A receiving half of the job queue, shared between workers.
///
/// Workers take turns on the underlying receiver: whichever worker holds the
/// lock waits for the next candidate, the rest wait for the lock.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Candidate>>>,
}

impl JobReceiver {
    /// Receives the next candidate, or `None` once the queue is closed and
    /// fully drained.
    pub async fn recv(&self) -> Option<Candidate> {
        self.rx.lock().await.recv().await
    }
}

/// Creates a bounded job queue holding at most `capacity` candidates.
///
/// # Panics
///
/// Panics if `capacity` is zero. [`PipelineConfig::validate`] rejects that
/// value before any queue is built.
///
/// [`PipelineConfig::validate`]: crate::PipelineConfig::validate
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let sender = JobSender {
        tx: Some(tx),
        state: Arc::new(AtomicU8::new(QueueState::Open as u8)),
    };
    let receiver = JobReceiver {
        rx: Arc::new(Mutex::new(rx)),
    };
    (sender, receiver)
}
