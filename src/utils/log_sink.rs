//! Per-run test log files
//!
//! Every run gets its own log file shared by all of its work units, at
//! `<log_dir>/[<request_id>_]<test_name>/test_<timestamp>.log`.

use chrono::Local;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{warn, Level};

use crate::error::{RunnerError, RunnerResult};

/// Writable log destination for one run
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    threshold: Level,
    writer: Mutex<BufWriter<File>>,
}

impl LogSink {
    /// Create (truncate) the log file at `path`, creating parent directories
    pub fn create(path: impl Into<PathBuf>) -> RunnerResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| RunnerError::LogSink {
                path: path.clone(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| RunnerError::LogSink {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            threshold: Level::INFO,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line; records more verbose than the threshold are dropped
    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        if level > self.threshold {
            return;
        }
        let line = format_line(level, message.as_ref());
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
        {
            warn!("Failed to write to {}: {}", self.path.display(), e);
        }
    }
}

fn format_line(level: Level, message: &str) -> String {
    format!(
        "{} {:<5} - {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
        level.as_str(),
        message
    )
}

/// Provides the log destination for a run
pub trait LogSinkFactory: Send + Sync {
    fn create(&self, request_id: Option<&str>, test_name: &str) -> RunnerResult<LogSink>;
}

/// Creates log files under a base directory
#[derive(Clone, Debug)]
pub struct FileLogSinkFactory {
    base_dir: PathBuf,
}

impl FileLogSinkFactory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Default for FileLogSinkFactory {
    fn default() -> Self {
        Self::new("logs")
    }
}

impl LogSinkFactory for FileLogSinkFactory {
    fn create(&self, request_id: Option<&str>, test_name: &str) -> RunnerResult<LogSink> {
        let stamp = Local::now().format("%Y-%m-%d-%H%M%S").to_string();
        let path = self
            .base_dir
            .join(log_file_name(request_id, test_name, &stamp));
        LogSink::create(path)
    }
}

/// Relative log path for a run. A missing or literal "null" request id is omitted.
pub fn log_file_name(request_id: Option<&str>, test_name: &str, stamp: &str) -> PathBuf {
    let dir = match request_id {
        Some(id) if !id.is_empty() && id != "null" => format!("{id}_{test_name}"),
        _ => test_name.to_string(),
    };
    PathBuf::from(dir).join(format!("test_{stamp}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name(Some("req42"), "JoinTest", "2024-01-01-120000"),
            PathBuf::from("req42_JoinTest/test_2024-01-01-120000.log")
        );
        assert_eq!(
            log_file_name(Some("null"), "JoinTest", "s"),
            PathBuf::from("JoinTest/test_s.log")
        );
        assert_eq!(
            log_file_name(None, "JoinTest", "s"),
            PathBuf::from("JoinTest/test_s.log")
        );
    }

    #[test]
    fn test_sink_respects_threshold() {
        let dir = tempdir().unwrap();
        let factory = FileLogSinkFactory::new(dir.path());
        let sink = factory.create(Some("r1"), "smoke").unwrap();

        sink.log(Level::INFO, "unit 1 started");
        sink.log(Level::DEBUG, "hidden detail");
        sink.log(Level::ERROR, "unit 2 failed");

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO  - unit 1 started"));
        assert!(lines[1].contains("ERROR - unit 2 failed"));
        assert!(sink.path().starts_with(dir.path().join("r1_smoke")));
    }

    #[test]
    fn test_sink_creation_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let factory = FileLogSinkFactory::new(&blocker);
        let err = factory.create(None, "smoke").unwrap_err();
        assert!(matches!(err, RunnerError::LogSink { .. }));
    }
}
