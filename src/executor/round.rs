//! Round dispatch
//!
//! A round submits every pending unit to the worker pool and waits for all of
//! them before partitioning the outcomes.

use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, warn};

use super::pool::WorkerPool;
use super::unit::WorkUnit;
use crate::error::{RunnerError, RunnerResult};
use crate::models::Outcome;

/// Partitioned outcomes of one round
pub struct RoundOutcome<U: WorkUnit> {
    pub finals: Vec<U::Output>,
    pub retrying: Vec<Arc<U>>,
    /// Units whose attempt returned an error or panicked
    pub failed: usize,
    /// Units cancelled by a pool shutdown
    pub abandoned: usize,
}

impl<U: WorkUnit> RoundOutcome<U> {
    fn new() -> Self {
        Self {
            finals: Vec::new(),
            retrying: Vec::new(),
            failed: 0,
            abandoned: 0,
        }
    }

    /// Units that left the run this round without a result
    pub fn dropped(&self) -> usize {
        self.failed + self.abandoned
    }
}

/// Run one round on the shared pool.
///
/// Fails only when the pool is already gone at submission time, in which case
/// nothing was spawned.
pub async fn run_round<U: WorkUnit>(
    pool: &Mutex<Option<WorkerPool>>,
    round: u32,
    units: Vec<Arc<U>>,
) -> RunnerResult<RoundOutcome<U>> {
    let submitted = {
        let mut slot = pool.lock().unwrap_or_else(PoisonError::into_inner);
        let pool = slot.as_mut().ok_or(RunnerError::PoolShutdown)?;
        units
            .into_iter()
            .map(|unit| {
                let task_unit = Arc::clone(&unit);
                let handle = pool.spawn(async move { task_unit.attempt().await });
                (unit, handle)
            })
            .collect::<Vec<_>>()
    };
    debug!("Round {}: submitted {} unit(s)", round, submitted.len());

    let (units, handles): (Vec<_>, Vec<_>) = submitted.into_iter().unzip();
    let joined = join_all(handles).await;

    let mut outcome = RoundOutcome::new();
    for (unit, result) in units.into_iter().zip(joined) {
        match result {
            Ok(Some(Ok(Outcome::Retry))) => {
                debug!("{} requested a retry", unit.label());
                outcome.retrying.push(unit);
            }
            Ok(Some(Ok(Outcome::Done(value)))) => outcome.finals.push(value),
            Ok(Some(Err(e))) => {
                error!("{} failed in round {}: {:#}", unit.label(), round, e);
                outcome.failed += 1;
            }
            Ok(None) => {
                warn!(
                    "{} abandoned in round {}: worker pool shut down",
                    unit.label(),
                    round
                );
                outcome.abandoned += 1;
            }
            Err(e) if e.is_cancelled() => {
                warn!("{} cancelled in round {}", unit.label(), round);
                outcome.abandoned += 1;
            }
            Err(e) => {
                error!("{} panicked in round {}: {}", unit.label(), round, e);
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        retries: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WorkUnit for Flaky {
        type Output = u32;

        fn set_index(&mut self, _index: usize) {}
        fn set_total(&mut self, _total: usize) {}

        async fn attempt(&self) -> anyhow::Result<Outcome<u32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.retries {
                u32::MAX => anyhow::bail!("broken"),
                n if call < n => Ok(Outcome::Retry),
                _ => Ok(Outcome::Done(call)),
            }
        }

        fn terminate(&self) {}
    }

    fn flaky(retries: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            retries,
            calls: AtomicU32::new(0),
        })
    }

    enum Behavior {
        Panic,
        Value(u32),
        Sleep(Duration),
    }

    struct Scripted(Behavior);

    #[async_trait]
    impl WorkUnit for Scripted {
        type Output = u32;

        fn set_index(&mut self, _index: usize) {}
        fn set_total(&mut self, _total: usize) {}

        async fn attempt(&self) -> anyhow::Result<Outcome<u32>> {
            match self.0 {
                Behavior::Panic => panic!("unit blew up"),
                Behavior::Value(v) => Ok(Outcome::Done(v)),
                Behavior::Sleep(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Outcome::Done(0))
                }
            }
        }

        fn terminate(&self) {}
    }

    #[tokio::test]
    async fn test_round_partitions_outcomes() {
        let pool = Mutex::new(Some(WorkerPool::new(2)));
        let retrying = flaky(1);
        let units = vec![flaky(0), Arc::clone(&retrying), flaky(u32::MAX)];

        let outcome = run_round(&pool, 1, units).await.unwrap();
        assert_eq!(outcome.finals, vec![0]);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.retrying.len(), 1);
        assert!(Arc::ptr_eq(&outcome.retrying[0], &retrying));

        let outcome = run_round(&pool, 2, outcome.retrying).await.unwrap();
        assert_eq!(outcome.finals, vec![1]);
        assert!(outcome.retrying.is_empty());
    }

    #[tokio::test]
    async fn test_round_without_pool() {
        let pool: Mutex<Option<WorkerPool>> = Mutex::new(None);
        let result = run_round(&pool, 1, vec![flaky(0)]).await;
        assert!(matches!(result, Err(RunnerError::PoolShutdown)));
    }

    #[tokio::test]
    async fn test_panicking_unit_is_isolated() {
        let pool = Mutex::new(Some(WorkerPool::new(1)));
        let units = vec![
            Arc::new(Scripted(Behavior::Panic)),
            Arc::new(Scripted(Behavior::Value(7))),
        ];

        let outcome = run_round(&pool, 1, units).await.unwrap();
        assert_eq!(outcome.finals, vec![7]);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.abandoned, 0);
        assert!(outcome.retrying.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_mid_round_abandons_units() {
        let pool = Mutex::new(Some(WorkerPool::new(1)));
        // The second unit waits for the only worker slot
        let units = vec![
            Arc::new(Scripted(Behavior::Sleep(Duration::from_secs(60)))),
            Arc::new(Scripted(Behavior::Value(3))),
        ];

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let taken = pool.lock().unwrap().take();
            taken.map(WorkerPool::shutdown_now)
        };
        let (outcome, aborted) = tokio::join!(run_round(&pool, 1, units), shutdown);

        let outcome = outcome.unwrap();
        assert_eq!(aborted, Some(2));
        assert!(outcome.finals.is_empty());
        assert_eq!(outcome.abandoned, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.dropped(), 2);
    }
}
