//! Fan-out worker pool and fan-in result stream.
//!
//! ## Structure
//!
//! - [`manager`] - spawns workers and owns the completion barrier that closes
//!   the result stream (`WorkerPool`).
//! - [`worker`] - the per-worker receive/evaluate/forward loop.

mod manager;
mod worker;

pub use manager::*;
pub use worker::*;
