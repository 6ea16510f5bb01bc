//! Matrix runner
//!
//! Runs one work unit per tuple on a bounded worker pool. Units that ask for a
//! retry are resubmitted in the next round; a round always drains completely
//! before the next one starts. [`MatrixRunner::interrupt`] can be called from
//! any thread to stop further rounds and force-stop the pool.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use super::pool::WorkerPool;
use super::round::run_round;
use super::unit::{UnitFactory, WorkUnit};
use crate::config::RunnerConfig;
use crate::models::{RunStats, Tuple};
use crate::results::ReportSink;
use crate::utils::{LogSinkFactory, RoundClock, Timer};

type Output<F> = <<F as UnitFactory>::Unit as WorkUnit>::Output;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Execution engine for one matrix run
pub struct MatrixRunner<F: UnitFactory> {
    config: RunnerConfig,
    tuples: Vec<Tuple>,
    factory: F,
    report: Arc<dyn ReportSink>,
    log_factory: Arc<dyn LogSinkFactory>,
    interrupted: AtomicBool,
    rounds: AtomicU32,
    pools_created: AtomicU32,
    /// Guards shutdown. Lock order: `pool`, then `units`.
    pool: Mutex<Option<WorkerPool>>,
    units: Mutex<Vec<Arc<F::Unit>>>,
}

impl<F: UnitFactory> MatrixRunner<F> {
    /// Tuples get the run-wide firefox profile and chrome extension applied here
    pub fn new(
        config: RunnerConfig,
        tuples: Vec<Tuple>,
        factory: F,
        report: Arc<dyn ReportSink>,
        log_factory: Arc<dyn LogSinkFactory>,
    ) -> Self {
        let tuples = tuples
            .into_iter()
            .map(|t| {
                t.with_client_defaults(
                    config.firefox_profile.as_deref(),
                    config.chrome_extension.as_deref(),
                )
            })
            .collect();

        Self {
            config,
            tuples,
            factory,
            report,
            log_factory,
            interrupted: AtomicBool::new(false),
            rounds: AtomicU32::new(0),
            pools_created: AtomicU32::new(0),
            pool: Mutex::new(None),
            units: Mutex::new(Vec::new()),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Rounds started so far
    pub fn rounds_executed(&self) -> u32 {
        self.rounds.load(Ordering::SeqCst)
    }

    /// Run the matrix and return every final result.
    ///
    /// Never fails: units that error are logged and left out. Whatever happens,
    /// the report sink is notified and the pool is shut down before returning.
    pub async fn run(&self) -> Vec<Output<F>> {
        let total = self.tuples.len();
        if total == 0 {
            info!("No tuples to execute for {}", self.config.name);
            return Vec::new();
        }

        let _cleanup = RunCleanup { runner: self };
        let timer = Timer::start(format!("run {}", self.config.name));

        info!(
            "Executing {} for {} client tuples with size: {}",
            self.config.name,
            total,
            self.tuples[0].len()
        );

        let log = match self
            .log_factory
            .create(self.config.request_id.as_deref(), &self.config.name)
        {
            Ok(sink) => {
                debug!("Test log: {}", sink.path().display());
                Some(Arc::new(sink))
            }
            Err(e) => {
                warn!("Running without a test log: {e}");
                None
            }
        };

        let units: Vec<Arc<F::Unit>> = self
            .tuples
            .iter()
            .enumerate()
            .map(|(i, tuple)| {
                let mut unit = self.factory.create(tuple, log.clone());
                unit.set_index(i + 1);
                unit.set_total(total);
                Arc::new(unit)
            })
            .collect();
        lock(&self.units).clone_from(&units);

        {
            let mut slot = lock(&self.pool);
            *slot = Some(WorkerPool::new(self.config.threads));
            self.pools_created.fetch_add(1, Ordering::SeqCst);
        }

        let finals = self.drive_rounds(units).await;

        info!(
            "Finished {}: {} result(s) from {} unit(s) in {} round(s), {}ms",
            self.config.name,
            finals.len(),
            total,
            self.rounds_executed(),
            timer.elapsed_ms()
        );
        finals
    }

    /// Like [`run`](Self::run), also reporting how the run went
    pub async fn run_with_stats(&self) -> (Vec<Output<F>>, RunStats) {
        let timer = Timer::start("run_with_stats");
        let results = self.run().await;
        let stats = RunStats {
            requested: self.tuples.len(),
            returned: results.len(),
            rounds: self.rounds_executed(),
            interrupted: self.is_interrupted(),
            duration_ms: timer.elapsed_ms(),
        };
        (results, stats)
    }

    async fn drive_rounds(&self, mut pending: Vec<Arc<F::Unit>>) -> Vec<Output<F>> {
        let mut finals = Vec::new();
        let mut clock = RoundClock::new();
        let mut round = 0;

        while !pending.is_empty() {
            if self.is_interrupted() {
                info!(
                    "Interrupted; not starting round {} ({} unit(s) pending)",
                    round + 1,
                    pending.len()
                );
                break;
            }
            if let Some(max) = self.config.max_rounds {
                if round >= max {
                    warn!(
                        "Reached max rounds ({}); dropping {} unit(s) still asking for retry",
                        max,
                        pending.len()
                    );
                    break;
                }
            }

            round += 1;
            self.rounds.store(round, Ordering::SeqCst);
            info!("=== Round {} ({} unit(s)) ===", round, pending.len());

            match run_round(&self.pool, round, pending).await {
                Ok(outcome) => {
                    clock.lap(round);
                    info!(
                        "Round {} completed: {} done, {} retrying, {} dropped",
                        round,
                        outcome.finals.len(),
                        outcome.retrying.len(),
                        outcome.dropped()
                    );
                    finals.extend(outcome.finals);
                    pending = outcome.retrying;
                }
                Err(e) => {
                    // Nothing was dispatched
                    self.rounds.store(round - 1, Ordering::SeqCst);
                    if self.is_interrupted() {
                        info!("Round {} not dispatched: {}", round, e);
                    } else {
                        error!("Round {} dispatch failed: {}", round, e);
                    }
                    break;
                }
            }
        }

        debug!("Round timings for {}:\n{}", self.config.name, clock.format());
        finals
    }

    /// Stop the run: no new rounds start and the pool is force-stopped.
    ///
    /// Safe to call from any thread, any number of times. The run cannot be
    /// resumed afterwards.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.shutdown_executors();
    }

    /// Terminate every unit and abort the pool, once. A missing pool is a no-op.
    fn shutdown_executors(&self) {
        let mut slot = lock(&self.pool);
        if let Some(pool) = slot.take() {
            let units = lock(&self.units);
            for unit in units.iter() {
                unit.terminate();
            }
            let aborted = pool.shutdown_now();
            debug!(
                "Terminated {} unit(s), aborted {} attempt(s)",
                units.len(),
                aborted
            );
        }
        info!("shutdown_executors() done.");
    }

    fn finish_run(&self) {
        self.report.mark_stopped();
        if let Err(e) = self.report.generate_report_files() {
            error!("Failed to generate report files: {e}");
        }
        self.shutdown_executors();
    }
}

#[cfg(test)]
impl<F: UnitFactory> MatrixRunner<F> {
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn pools_created(&self) -> u32 {
        self.pools_created.load(Ordering::SeqCst)
    }

    /// True while a worker pool is alive
    pub fn has_pool(&self) -> bool {
        lock(&self.pool).is_some()
    }
}

/// Runs end-of-run cleanup on every exit path, including cancellation of the
/// `run` future and panics.
struct RunCleanup<'a, F: UnitFactory> {
    runner: &'a MatrixRunner<F>,
}

impl<F: UnitFactory> Drop for RunCleanup<'_, F> {
    fn drop(&mut self) {
        self.runner.finish_run();
    }
}
