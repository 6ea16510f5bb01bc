//! Command-backed work unit
//!
//! Runs an external test command once per attempt with the tuple exposed via
//! environment variables. Exit code 0 passes, the configured retry code asks
//! for another round, anything else fails.

use anyhow::Context;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, Level};

use super::unit::{UnitFactory, WorkUnit};
use crate::config::CommandConfig;
use crate::models::{Outcome, TestOutcome, TestStatus, Tuple};
use crate::results::SuiteReport;
use crate::utils::{LogSink, Timer};

pub struct CommandUnit {
    command: CommandConfig,
    tuple: Tuple,
    index: usize,
    total: usize,
    attempts: AtomicU32,
    terminated: AtomicBool,
    stop: Notify,
    report: Arc<SuiteReport>,
    log: Option<Arc<LogSink>>,
}

impl CommandUnit {
    pub fn new(
        command: CommandConfig,
        tuple: Tuple,
        report: Arc<SuiteReport>,
        log: Option<Arc<LogSink>>,
    ) -> Self {
        Self {
            command,
            tuple,
            index: 0,
            total: 0,
            attempts: AtomicU32::new(0),
            terminated: AtomicBool::new(false),
            stop: Notify::new(),
            report,
            log,
        }
    }

    fn env(&self, attempt: u32) -> anyhow::Result<Vec<(String, String)>> {
        let mut vars = vec![
            ("KITE_INDEX".to_string(), self.index.to_string()),
            ("KITE_TOTAL".to_string(), self.total.to_string()),
            ("KITE_ATTEMPT".to_string(), attempt.to_string()),
            (
                "KITE_TUPLE".to_string(),
                serde_json::to_string(&self.tuple).context("Failed to serialize tuple")?,
            ),
        ];
        for (n, client) in self.tuple.clients().iter().enumerate() {
            let prefix = format!("KITE_CLIENT_{}", n + 1);
            vars.push((format!("{prefix}_BROWSER"), client.browser_name.clone()));
            if let Some(version) = &client.version {
                vars.push((format!("{prefix}_VERSION"), version.clone()));
            }
            if let Some(platform) = &client.platform {
                vars.push((format!("{prefix}_PLATFORM"), platform.clone()));
            }
        }
        Ok(vars)
    }

    fn log_line(&self, level: Level, line: &str) {
        if let Some(log) = &self.log {
            log.log(level, line);
        }
    }

    /// Record a final outcome in the report and the run log
    fn finish(&self, outcome: TestOutcome) -> Outcome<TestOutcome> {
        info!("[{}/{}] {}", self.index, self.total, outcome);
        let level = match outcome.status {
            TestStatus::Pass => Level::INFO,
            TestStatus::Fail => Level::WARN,
            TestStatus::Error => Level::ERROR,
        };
        self.log_line(level, &outcome.to_string());
        self.report.record(outcome.clone());
        Outcome::Done(outcome)
    }
}

#[async_trait]
impl WorkUnit for CommandUnit {
    type Output = TestOutcome;

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn set_total(&mut self, total: usize) {
        self.total = total;
    }

    async fn attempt(&self) -> anyhow::Result<Outcome<TestOutcome>> {
        if self.terminated.load(Ordering::SeqCst) {
            anyhow::bail!("{} was terminated", self.label());
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = Timer::start(format!("{} attempt {}", self.label(), attempt));
        let tuple = self.tuple.to_string();
        debug!("Starting {} attempt {} for {}", self.label(), attempt, tuple);

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .envs(self.env(attempt)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let outcome = TestOutcome::error(
                    self.index,
                    tuple,
                    format!("Failed to start {}: {}", self.command.program, e),
                )
                .with_attempts(attempt);
                return Ok(self.finish(outcome));
            }
        };

        // Dropping `child` on the stop branch kills the process
        let status = tokio::select! {
            status = child.wait() => status.context("Failed to wait for test command")?,
            () = self.stop.notified() => {
                anyhow::bail!("{} terminated during attempt {}", self.label(), attempt);
            }
        };
        let duration_ms = timer.stop().as_millis() as u64;

        let outcome = match status.code() {
            Some(0) => TestOutcome::pass(self.index, tuple),
            Some(code) if code == self.command.retry_exit_code => {
                self.log_line(
                    Level::INFO,
                    &format!(
                        "#{} {} requested retry after attempt {}",
                        self.index, tuple, attempt
                    ),
                );
                return Ok(Outcome::Retry);
            }
            Some(code) => TestOutcome::fail(self.index, tuple, format!("Exit code {code}"))
                .with_exit_code(code),
            None => TestOutcome::fail(self.index, tuple, "Terminated by signal"),
        };

        Ok(self.finish(
            outcome
                .with_attempts(attempt)
                .with_duration(duration_ms),
        ))
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        // Stores a permit if no attempt is waiting yet
        self.stop.notify_one();
        debug!("Terminate requested for {}", self.label());
    }

    fn label(&self) -> String {
        format!("test {}/{}", self.index, self.total)
    }
}

/// Builds a [`CommandUnit`] per tuple, all reporting into one suite
pub struct CommandUnitFactory {
    command: CommandConfig,
    report: Arc<SuiteReport>,
}

impl CommandUnitFactory {
    pub fn new(command: CommandConfig, report: Arc<SuiteReport>) -> Self {
        Self { command, report }
    }
}

impl UnitFactory for CommandUnitFactory {
    type Unit = CommandUnit;

    fn create(&self, tuple: &Tuple, log: Option<Arc<LogSink>>) -> CommandUnit {
        CommandUnit::new(
            self.command.clone(),
            tuple.clone(),
            Arc::clone(&self.report),
            log,
        )
    }
}
