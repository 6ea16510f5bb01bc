//! Bounded worker pool
//!
//! Concurrency is capped by a semaphore; every spawned attempt is tracked by
//! its abort handle so the pool can be force-stopped.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

pub struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
    tasks: Vec<AbortHandle>,
}

impl WorkerPool {
    /// Pool running at most `size` tasks at once (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            semaphore: Arc::new(Semaphore::new(size)),
            tasks: Vec::new(),
        }
    }

    /// Spawn `task` once a worker slot frees up.
    ///
    /// Resolves to `None` if the pool is shut down before a slot is acquired.
    pub fn spawn<F>(&mut self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            Some(task.await)
        });

        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(handle.abort_handle());
        handle
    }

    /// Stop accepting work and abort every unfinished task.
    /// Returns the number of tasks aborted.
    pub fn shutdown_now(self) -> usize {
        self.semaphore.close();
        let mut aborted = 0;
        for task in self.tasks {
            if !task.is_finished() {
                task.abort();
                aborted += 1;
            }
        }
        debug!("Worker pool ({} slots) aborted {} task(s)", self.size, aborted);
        aborted
    }
}

#[cfg(test)]
impl WorkerPool {
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_pool_size_floor() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        assert_eq!(WorkerPool::new(8).size(), 8);
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let mut pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(()));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_and_rejects() {
        let mut pool = WorkerPool::new(1);
        let running = pool.spawn(tokio::time::sleep(Duration::from_secs(60)));
        let queued = pool.spawn(async { 7 });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.in_flight(), 2);

        let aborted = pool.shutdown_now();
        assert_eq!(aborted, 2);
        assert!(running.await.unwrap_err().is_cancelled());
        assert!(queued.await.unwrap_err().is_cancelled());
    }
}
