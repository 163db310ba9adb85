//! The result collector: single consumer of the result stream.

use crate::{Candidate, PipelineState, state::StatePublisher};
use core::{fmt, time::Duration};
use std::sync::Arc;
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

/// Receives every match in arrival order.
///
/// `ordinal` is the 1-based position of the match in the result stream.
/// Arrival order is not candidate order once more than one worker runs.
pub trait ResultSink: Send + 'static {
    fn on_match(&mut self, ordinal: u64, candidate: Candidate);
}

/// Discards matches.
impl ResultSink for () {
    fn on_match(&mut self, _ordinal: u64, _candidate: Candidate) {}
}

/// Collects matches in arrival order.
impl ResultSink for Vec<Candidate> {
    fn on_match(&mut self, _ordinal: u64, candidate: Candidate) {
        self.push(candidate);
    }
}

impl<F> ResultSink for F
where
    F: FnMut(u64, Candidate) + Send + 'static,
{
    fn on_match(&mut self, ordinal: u64, candidate: Candidate) {
        self(ordinal, candidate);
    }
}

/// One-shot capture of the time taken to observe `target` results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Milestone {
    target: u64,
    reached_after: Option<Duration>,
}

impl Milestone {
    pub const fn new(target: u64) -> Self {
        Self {
            target,
            reached_after: None,
        }
    }

    pub const fn target(&self) -> u64 {
        self.target
    }

    /// Elapsed time at which the target was first reached, if it was.
    pub const fn reached_after(&self) -> Option<Duration> {
        self.reached_after
    }

    /// Records that `count` results have been observed. The first time
    /// `count` reaches the target, `elapsed` is called and its value kept;
    /// every later call is a no-op. Returns `true` only for that first call.
    pub fn observe(&mut self, count: u64, elapsed: impl FnOnce() -> Duration) -> bool {
        if self.reached_after.is_some() || count < self.target {
            return false;
        }
        self.reached_after = Some(elapsed());
        true
    }
}

/// Final report of a run: exactly one of the two outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Report {
    /// The run ended before the milestone was reached.
    TotalMatches { matches: u64 },
    /// The milestone was reached after `elapsed`.
    MilestoneReached { target: u64, elapsed: Duration },
}

impl Report {
    pub fn new(milestone: &Milestone, matches: u64) -> Self {
        match milestone.reached_after() {
            Some(elapsed) => Self::MilestoneReached {
                target: milestone.target(),
                elapsed,
            },
            None => Self::TotalMatches { matches },
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalMatches { matches } => write!(f, "Total matches found: {matches}"),
            Self::MilestoneReached { target, elapsed } => {
                write!(f, "Time to find first {target} matches: {elapsed:?}")
            }
        }
    }
}

/// What the collector saw, plus the sink handed back to the caller.
#[derive(Debug)]
pub struct Collected<S> {
    pub report: Report,
    pub matches: u64,
    pub milestone: Milestone,
    pub sink: S,
}

/// Drains the result stream until it is closed, counting matches and
/// capturing the milestone.
pub struct ResultCollector<S> {
    results: mpsc::Receiver<Candidate>,
    milestone: Milestone,
    start: Instant,
    sink: S,
    state: Option<Arc<StatePublisher>>,
}

impl<S> ResultCollector<S>
where
    S: ResultSink,
{
    /// `start` is the instant the milestone's elapsed time is measured from.
    pub fn new(
        results: mpsc::Receiver<Candidate>,
        milestone_target: u64,
        start: Instant,
        sink: S,
    ) -> Self {
        Self {
            results,
            milestone: Milestone::new(milestone_target),
            start,
            sink,
            state: None,
        }
    }

    #[must_use]
    pub(crate) fn with_state(mut self, state: Arc<StatePublisher>) -> Self {
        self.state = Some(state);
        self
    }

    pub async fn run(self) -> Collected<S> {
        let Self {
            results,
            mut milestone,
            start,
            mut sink,
            state,
        } = self;

        let mut stream = ReceiverStream::new(results);
        let mut matches: u64 = 0;

        while let Some(candidate) = stream.next().await {
            matches += 1;
            sink.on_match(matches, candidate);

            if milestone.observe(matches, || start.elapsed()) {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    "Milestone of {} matches reached after {:?}",
                    milestone.target(),
                    milestone.reached_after()
                );
            }
        }

        if let Some(state) = &state {
            state.advance(PipelineState::Terminated);
        }

        let report = Report::new(&milestone, matches);

        #[cfg(feature = "tracing")]
        tracing::debug!("Result stream closed after {matches} matches");

        Collected {
            report,
            matches,
            milestone,
            sink,
        }
    }
}
