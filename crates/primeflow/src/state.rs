use tokio::sync::watch;

/// Pipeline-level lifecycle.
///
/// The pipeline only ever moves forward: `Running → Draining → Terminated`.
/// `Draining` is never skipped, even when cancellation arrives before the
/// first candidate is generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// The job source is producing candidates.
    Running,
    /// The job source has stopped; workers are finishing queued candidates.
    Draining,
    /// The result stream is closed and the collector has exited.
    Terminated,
}

/// Publishes [`PipelineState`] transitions to any number of watchers.
#[derive(Debug)]
pub(crate) struct StatePublisher {
    tx: watch::Sender<PipelineState>,
}

impl StatePublisher {
    pub(crate) fn new() -> (Self, watch::Receiver<PipelineState>) {
        let (tx, rx) = watch::channel(PipelineState::Running);
        (Self { tx }, rx)
    }

    /// Moves to `next` if it is ahead of the current state. Returns whether
    /// the state changed.
    pub(crate) fn advance(&self, next: PipelineState) -> bool {
        self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_never_moves_backwards() {
        let (publisher, rx) = StatePublisher::new();
        assert_eq!(*rx.borrow(), PipelineState::Running);

        assert!(publisher.advance(PipelineState::Draining));
        assert!(!publisher.advance(PipelineState::Running));
        assert!(!publisher.advance(PipelineState::Draining));
        assert_eq!(*rx.borrow(), PipelineState::Draining);

        assert!(publisher.advance(PipelineState::Terminated));
        assert!(!publisher.advance(PipelineState::Draining));
        assert_eq!(*rx.borrow(), PipelineState::Terminated);
    }
}
