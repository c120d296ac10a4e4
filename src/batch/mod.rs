//! Sequential, quota-limited index checking over an uploaded URL table.

pub mod pacing;
pub mod processor;
pub mod rows;

pub use pacing::{FixedDelay, Pacer};
pub use processor::{BatchOptions, BatchOutcome, Progress, StopReason, Tally, run_batch};
pub use rows::{TableError, UrlTable};
