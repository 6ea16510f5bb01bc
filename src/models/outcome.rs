//! Attempt outcomes and run results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a single work unit attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Resubmit the same unit in the next round
    Retry,
    /// Final result for this unit
    Done(T),
}

#[cfg(test)]
impl<T> Outcome<T> {
    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::Retry)
    }

    pub fn into_done(self) -> Option<T> {
        match self {
            Outcome::Retry => None,
            Outcome::Done(value) => Some(value),
        }
    }
}

/// Final status of a test execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Error => "!",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Result of one tuple's test execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestOutcome {
    /// 1-based position of the tuple in the matrix
    pub index: usize,
    pub tuple: String,
    pub status: TestStatus,
    /// Number of attempts including the final one
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestOutcome {
    fn new(index: usize, tuple: impl Into<String>, status: TestStatus) -> Self {
        Self {
            index,
            tuple: tuple.into(),
            status,
            attempts: 1,
            duration_ms: 0,
            exit_code: None,
            message: None,
        }
    }

    pub fn pass(index: usize, tuple: impl Into<String>) -> Self {
        Self::new(index, tuple, TestStatus::Pass)
    }

    pub fn fail(index: usize, tuple: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(index, tuple, TestStatus::Fail).with_message(message)
    }

    pub fn error(index: usize, tuple: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(index, tuple, TestStatus::Error).with_message(error)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {} [{}ms, {} attempt(s)]",
            self.status.symbol(),
            self.index,
            self.tuple,
            self.duration_ms,
            self.attempts
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Counters describing how a run went
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Units created (one per tuple)
    pub requested: usize,
    /// Final results returned
    pub returned: usize,
    pub rounds: u32,
    pub interrupted: bool,
    pub duration_ms: u64,
}

impl RunStats {
    /// Units that failed, were abandoned, or were still pending when the run stopped
    pub fn dropped(&self) -> usize {
        self.requested.saturating_sub(self.returned)
    }

    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.dropped() == 0
    }
}

/// Summary of a full matrix run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub stats: RunStats,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub results: Vec<TestOutcome>,
}

impl RunSummary {
    pub fn new(name: impl Into<String>, stats: RunStats, mut results: Vec<TestOutcome>) -> Self {
        results.sort_by_key(|r| r.index);

        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(TestStatus::Pass);
        let failed = count(TestStatus::Fail);
        let errors = count(TestStatus::Error);

        Self {
            name: name.into(),
            stats,
            passed,
            failed,
            errors,
            results,
        }
    }

    /// Pass rate over the requested units, so dropped units count against it
    pub fn pass_rate(&self) -> f64 {
        if self.stats.requested == 0 {
            0.0
        } else {
            (self.passed as f64 / self.stats.requested as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.stats.is_complete() && self.passed == self.stats.requested
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.name)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Requested: {} | Pass: {} | Fail: {} | Error: {} | Dropped: {}",
            self.stats.requested,
            self.passed,
            self.failed,
            self.errors,
            self.stats.dropped()
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Rounds: {} | Duration: {}ms{}",
            self.pass_rate(),
            self.stats.rounds,
            self.stats.duration_ms,
            if self.stats.interrupted {
                " | INTERRUPTED"
            } else {
                ""
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let retry: Outcome<u32> = Outcome::Retry;
        assert!(retry.is_retry());
        assert_eq!(retry.into_done(), None);

        let done = Outcome::Done(20);
        assert!(!done.is_retry());
        assert_eq!(done.into_done(), Some(20));
    }

    #[test]
    fn test_outcome_display() {
        let outcome = TestOutcome::fail(3, "[chrome]", "exit code 1")
            .with_attempts(2)
            .with_duration(40);
        assert_eq!(
            outcome.to_string(),
            "✗ #3 [chrome] [40ms, 2 attempt(s)] - exit code 1"
        );
    }

    #[test]
    fn test_run_stats_dropped() {
        let stats = RunStats {
            requested: 5,
            returned: 3,
            rounds: 2,
            interrupted: false,
            duration_ms: 10,
        };
        assert_eq!(stats.dropped(), 2);
        assert!(!stats.is_complete());
    }

    #[test]
    fn test_run_summary_counts() {
        let stats = RunStats {
            requested: 4,
            returned: 3,
            rounds: 1,
            interrupted: false,
            duration_ms: 100,
        };
        let summary = RunSummary::new(
            "smoke",
            stats,
            vec![
                TestOutcome::pass(2, "[a]"),
                TestOutcome::pass(1, "[b]"),
                TestOutcome::error(3, "[c]", "spawn failed"),
            ],
        );

        assert_eq!(summary.passed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.results[0].index, 1);
        assert_eq!(summary.pass_rate(), 50.0);
        assert!(!summary.is_all_passed());
    }
}
