//! Output formatters for run results
//!
//! Provides table, JSON, and one-line summary output.

use std::io::Write;

use crate::models::{RunSummary, TestOutcome, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: TestStatus) -> &'static str {
        match (status, self.colorize) {
            (TestStatus::Pass, true) => "\x1b[32m✓ PASS\x1b[0m",
            (TestStatus::Fail, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (TestStatus::Error, true) => "\x1b[31m! ERROR\x1b[0m",
            (TestStatus::Pass, false) => "✓ PASS",
            (TestStatus::Fail, false) => "✗ FAIL",
            (TestStatus::Error, false) => "! ERROR",
        }
    }

    fn format_outcome_row(&self, outcome: &TestOutcome) -> String {
        let mut row = format!(
            "{:3}. {:40} {} [{:>6}ms] x{}",
            outcome.index,
            outcome.tuple,
            self.status_label(outcome.status),
            outcome.duration_ms,
            outcome.attempts
        );
        if let Some(message) = &outcome.message {
            row.push_str(&format!(" - {message}"));
        }
        row
    }

    /// Format a full run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let stats = &summary.stats;
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " {} ({} tuple(s), {} round(s))\n",
            summary.name, stats.requested, stats.rounds
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        for outcome in &summary.results {
            output.push_str(&format!(" {}\n", self.format_outcome_row(outcome)));
        }

        output.push_str(" ───────────────────────────────────────────────────────────\n");

        let dropped = stats.dropped();
        let dropped_str = if self.colorize && dropped > 0 {
            format!("\x1b[33m{dropped}\x1b[0m")
        } else {
            dropped.to_string()
        };
        output.push_str(&format!(
            " Pass: {} | Fail: {} | Error: {} | Dropped: {}\n",
            summary.passed, summary.failed, summary.errors, dropped_str
        ));
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            stats.duration_ms
        ));
        if stats.interrupted {
            output.push_str(" Run was interrupted before all rounds completed\n");
        }

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%), {} dropped, {} round(s) in {}ms{}",
            summary.name,
            summary.passed,
            summary.stats.requested,
            summary.pass_rate(),
            summary.stats.dropped(),
            summary.stats.rounds,
            summary.stats.duration_ms,
            if summary.stats.interrupted {
                " [interrupted]"
            } else {
                ""
            }
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a run summary to a file
pub fn write_summary_to_file(
    path: &str,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunStats;

    fn summary(interrupted: bool) -> RunSummary {
        let stats = RunStats {
            requested: 3,
            returned: 2,
            rounds: 2,
            interrupted,
            duration_ms: 1500,
        };
        RunSummary::new(
            "JoinRoomTest",
            stats,
            vec![
                TestOutcome::pass(1, "[chrome 120]").with_attempts(2),
                TestOutcome::fail(3, "[firefox 121]", "Exit code 1"),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("csv"), None);
    }

    #[test]
    fn test_format_summary_brief() {
        let output = ResultFormatter::new(OutputFormat::Summary).format_summary(&summary(true));
        assert_eq!(
            output,
            "JoinRoomTest: 1/3 passed (33.3%), 1 dropped, 2 round(s) in 1500ms [interrupted]"
        );
    }

    #[test]
    fn test_format_summary_table() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_summary(&summary(false));
        assert!(output.contains("JoinRoomTest (3 tuple(s), 2 round(s))"));
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("Dropped: 1"));
        assert!(!output.contains("interrupted"));
    }

    #[test]
    fn test_format_summary_json() {
        let output = ResultFormatter::new(OutputFormat::Json).format_summary(&summary(false));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["passed"], 1);
        assert_eq!(value["stats"]["rounds"], 2);
    }
}
