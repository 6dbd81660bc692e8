//! Bounded worker pool for per-file work
//!
//! A pool is created for one command invocation, receives one task per
//! resource file, and is drained before the command returns. Draining is the
//! barrier that makes an async command look synchronous to the orchestrator.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Outcome of a drained pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Default)]
struct PoolState {
    pending: Mutex<usize>,
    idle: Condvar,
    succeeded: AtomicUsize,
    failures: Mutex<Vec<Error>>,
}

impl PoolState {
    fn record_failure(&self, error: Error) {
        lock(&self.failures).push(error);
    }

    fn task_finished(&self) {
        let mut pending = lock(&self.pending);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// Lock a mutex, recovering the data if a worker panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Marks a task finished even if it panics
struct TaskGuard {
    state: Arc<PoolState>,
    label: String,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("Task {} panicked", self.label);
            self.state.record_failure(Error::TaskFailed {
                label: self.label.clone(),
                source: Box::new(Error::WorkerPool("task panicked".to_string())),
            });
        }
        self.state.task_finished();
    }
}

/// Worker pool that runs submitted tasks and joins them on [`drain`](Self::drain)
pub struct ParallelFileProcessor {
    pool: rayon::ThreadPool,
    state: Arc<PoolState>,
    submitted: usize,
}

impl ParallelFileProcessor {
    /// Create a pool with `thread_count` workers
    pub fn new(thread_count: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count.max(1))
            .thread_name(|i| format!("resource-worker-{i}"))
            // The TaskGuard already records the failure; keep the worker alive
            .panic_handler(|_| {})
            .build()
            .map_err(|e| Error::WorkerPool(format!("failed to create thread pool: {e}")))?;

        Ok(Self {
            pool,
            state: Arc::new(PoolState::default()),
            submitted: 0,
        })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a unit of work; never blocks waiting for a free worker
    pub fn submit<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let label = label.into();
        *lock(&self.state.pending) += 1;
        self.submitted += 1;

        let guard = TaskGuard {
            state: Arc::clone(&self.state),
            label,
        };
        self.pool.spawn(move || {
            match task() {
                Ok(()) => {
                    guard.state.succeeded.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    log::error!("Task {} failed: {e}", guard.label);
                    guard.state.record_failure(Error::TaskFailed {
                        label: guard.label.clone(),
                        source: Box::new(e),
                    });
                }
            }
            drop(guard);
        });
    }

    /// Block until every submitted task has finished, then release the pool
    ///
    /// Waits without a timeout. Returns the first recorded failure, if any;
    /// every failure has already been logged.
    pub fn drain(self) -> Result<DrainReport> {
        {
            let mut pending = lock(&self.state.pending);
            while *pending > 0 {
                pending = match self.state.idle.wait(pending) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        }
        drop(self.pool);

        let mut failures = std::mem::take(&mut *lock(&self.state.failures));
        let report = DrainReport {
            submitted: self.submitted,
            succeeded: self.state.succeeded.load(Ordering::SeqCst),
            failed: failures.len(),
        };
        log::debug!(
            "Drained worker pool: {} submitted, {} failed",
            report.submitted,
            report.failed
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(failures.swap_remove(0))
        }
    }
}
