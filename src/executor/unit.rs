//! Work unit contract
//!
//! A work unit wraps one tuple's test. Each attempt either finishes with a
//! result or asks to be run again in the next round.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Outcome, Tuple};
use crate::utils::LogSink;

/// One runnable test execution, able to signal retry
#[async_trait]
pub trait WorkUnit: Send + Sync + 'static {
    type Output: Send + 'static;

    /// 1-based position in the matrix
    fn set_index(&mut self, index: usize);

    /// Number of units in the run
    fn set_total(&mut self, total: usize);

    /// Run the test once.
    ///
    /// `Err` means the attempt itself broke; the engine logs it and drops the
    /// unit. Test failures belong in `Done`.
    async fn attempt(&self) -> anyhow::Result<Outcome<Self::Output>>;

    /// Ask an in-flight attempt to stop. Advisory; must not block.
    fn terminate(&self);

    fn label(&self) -> String {
        "unit".to_string()
    }
}

/// Builds one work unit per tuple
pub trait UnitFactory: Send + Sync + 'static {
    type Unit: WorkUnit;

    fn create(&self, tuple: &Tuple, log: Option<Arc<LogSink>>) -> Self::Unit;
}
