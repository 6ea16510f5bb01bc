//! Suite report sink
//!
//! The engine notifies a [`ReportSink`] when a run stops and asks it to write
//! its report files. [`SuiteReport`] collects per-tuple outcomes and writes them
//! as JSON and CSV.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::info;

use crate::error::{RunnerError, RunnerResult};
use crate::models::TestOutcome;

/// Receives run lifecycle events from the engine
pub trait ReportSink: Send + Sync {
    /// Record the stop timestamp of the run
    fn mark_stopped(&self);

    /// Write the report files for the run
    fn generate_report_files(&self) -> RunnerResult<()>;
}

/// Serializable suite container
#[derive(Clone, Debug, Serialize)]
pub struct SuiteSnapshot {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_suite: Option<String>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub results: Vec<TestOutcome>,
}

/// Report container for one run
pub struct SuiteReport {
    report_dir: PathBuf,
    suite: Mutex<SuiteSnapshot>,
}

impl SuiteReport {
    pub fn new(name: impl Into<String>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            suite: Mutex::new(SuiteSnapshot {
                id: generate_run_id(),
                name: name.into(),
                parent_suite: None,
                started_at: Utc::now(),
                stopped_at: None,
                results: Vec::new(),
            }),
        }
    }

    pub fn with_parent_suite(self, parent: Option<String>) -> Self {
        self.lock().parent_suite = parent;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SuiteSnapshot> {
        self.suite.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, outcome: TestOutcome) {
        self.lock().results.push(outcome);
    }

    pub fn snapshot(&self) -> SuiteSnapshot {
        self.lock().clone()
    }

    pub fn json_path(&self) -> PathBuf {
        self.report_dir.join(format!("{}.json", self.lock().name))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.report_dir.join(format!("{}.csv", self.lock().name))
    }

    fn write_json(&self, suite: &SuiteSnapshot, path: &Path) -> RunnerResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), suite).map_err(|e| {
            RunnerError::Report {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }

    fn write_csv(&self, suite: &SuiteSnapshot, path: &Path) -> RunnerResult<()> {
        let report_err = |e: csv::Error| RunnerError::Report {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let mut writer = csv::Writer::from_path(path).map_err(report_err)?;

        writer
            .write_record([
                "index",
                "tuple",
                "status",
                "attempts",
                "duration_ms",
                "exit_code",
                "message",
            ])
            .map_err(report_err)?;

        let mut results = suite.results.clone();
        results.sort_by_key(|r| r.index);
        for result in &results {
            writer
                .write_record([
                    result.index.to_string(),
                    result.tuple.clone(),
                    result.status.to_string(),
                    result.attempts.to_string(),
                    result.duration_ms.to_string(),
                    result.exit_code.map(|c| c.to_string()).unwrap_or_default(),
                    result.message.clone().unwrap_or_default(),
                ])
                .map_err(report_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ReportSink for SuiteReport {
    fn mark_stopped(&self) {
        self.lock().stopped_at = Some(Utc::now());
    }

    fn generate_report_files(&self) -> RunnerResult<()> {
        fs::create_dir_all(&self.report_dir)?;
        let suite = self.snapshot();

        let json_path = self.json_path();
        self.write_json(&suite, &json_path)?;
        let csv_path = self.csv_path();
        self.write_csv(&suite, &csv_path)?;

        info!(
            "Wrote report for {} ({} result(s)) to {}",
            suite.name,
            suite.results.len(),
            self.report_dir.display()
        );
        Ok(())
    }
}

/// Timestamped suite name, e.g. `smoke_20240101_120000`
pub fn name_with_timestamp(name: &str) -> String {
    format!("{}_{}", name, Utc::now().format("%Y%m%d_%H%M%S"))
}

fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

#[cfg(test)]
impl SuiteReport {
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped_at.is_some()
    }
}
