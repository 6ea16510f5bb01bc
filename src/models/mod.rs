//! Data models for matrix runs
//!
//! Client tuples, attempt outcomes, and run summaries.

mod outcome;
mod tuple;

pub use outcome::{Outcome, RunStats, RunSummary, TestOutcome, TestStatus};
pub use tuple::{Client, Tuple};
