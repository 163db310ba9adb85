#![doc = include_str!("../README.md")]

mod collector;
mod config;
mod error;
mod pipeline;
mod pool;
mod predicate;
mod queue;
mod shutdown;
mod source;
mod state;
mod types;


pub use crate::collector::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::pipeline::*;
pub use crate::pool::*;
pub use crate::predicate::*;
pub use crate::queue::*;
pub use crate::shutdown::*;
pub use crate::source::*;
pub use crate::state::*;
pub use crate::types::*;
// Downstream crates wire their own interrupt sources against this token type.
pub use tokio_util::sync::CancellationToken;
