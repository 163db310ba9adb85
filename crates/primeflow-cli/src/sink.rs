use primeflow::{Candidate, Report, ResultSink};
use std::io::{self, Write};

/// Prints each prime to stdout as it arrives.
pub struct PrimePrinter {
    quiet: bool,
}

impl PrimePrinter {
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ResultSink for PrimePrinter {
    fn on_match(&mut self, ordinal: u64, candidate: Candidate) {
        if self.quiet {
            return;
        }
        // A closed stdout (e.g. piped into `head`) must not stop the run.
        let _ = writeln!(io::stdout().lock(), "{}", format_prime(ordinal, candidate));
    }
}

pub fn format_prime(ordinal: u64, candidate: Candidate) -> String {
    format!("Prime {ordinal} found: {candidate}")
}

pub fn format_report(report: &Report) -> String {
    match report {
        Report::TotalMatches { matches } => format!("Total primes found: {matches}"),
        Report::MilestoneReached { target, elapsed } => {
            format!("Time to find first {target} primes: {elapsed:?}")
        }
    }
}
