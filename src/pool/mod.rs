//! Bounded worker pool draining an unbounded FIFO backlog.
//!
//! A [`WorkerPool`] runs a fixed number of workers, each looping over
//! "take next task, run the handler, mark it complete". Tasks can be enqueued
//! at any time before [`WorkerPool::stop`]; the backlog never blocks the
//! producer.
//!
//! Failures are isolated per task: a handler that returns `Err` or panics is
//! logged with the task payload and the worker continues with the next task.
//! [`WorkerPool::stop`] cancels handlers still in flight at their next
//! suspension point.
//!
//! # Example
//!
//! ```
//! use harvester_core::pool::WorkerPool;
//!
//! # async fn example() -> Result<(), harvester_core::pool::PoolError> {
//! let pool = WorkerPool::new("numbers", 2, |n: u32| async move {
//!     println!("processing {n}");
//!     anyhow::Ok(())
//! })?;
//!
//! pool.start();
//! for n in 0..5 {
//!     pool.enqueue(n)?;
//! }
//! pool.join().await;
//! pool.stop().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod shutdown;

use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use error::{MAX_WORKERS, MIN_WORKERS, PoolError};
pub use handler::TaskHandler;
pub use shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Snapshot of task outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks whose handler returned `Ok`.
    pub completed: usize,
    /// Tasks whose handler returned `Err` or panicked.
    pub failed: usize,
    /// Tasks whose handler was dropped mid-flight by [`WorkerPool::stop`].
    pub cancelled: usize,
}

impl PoolStats {
    /// Tasks a worker picked up, whatever their outcome.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

/// State shared between the pool, its workers and any [`TaskSender`].
struct Shared<T> {
    name: String,
    backlog: Mutex<VecDeque<T>>,
    available: Notify,
    /// Accepted tasks not yet completed (queued plus in flight).
    outstanding: watch::Sender<usize>,
    shutdown: ShutdownTrigger,
    /// Set under the backlog lock so no task can slip in after the final drain.
    closed: AtomicBool,
    completed: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl<T> Shared<T> {
    fn backlog(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, task: T) -> Result<(), PoolError> {
        {
            let mut backlog = self.backlog();
            if self.closed.load(Ordering::SeqCst) {
                return Err(PoolError::Stopped {
                    name: self.name.clone(),
                });
            }
            backlog.push_back(task);
            self.outstanding.send_modify(|n| *n += 1);
        }
        self.available.notify_one();
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        self.backlog().pop_front()
    }

    fn mark_done(&self, count: usize) {
        self.outstanding
            .send_modify(|n| *n = n.saturating_sub(count));
    }
}

/// A cloneable handle for feeding tasks into a pool from other tasks.
pub struct TaskSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> TaskSender<T> {
    /// Appends `task` to the pool's backlog.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Stopped`] once the pool has been stopped.
    pub fn enqueue(&self, task: T) -> Result<(), PoolError> {
        self.shared.enqueue(task)
    }
}

enum Lifecycle {
    Idle,
    Running(Vec<JoinHandle<()>>),
    Stopped,
}

/// A fixed-size set of workers processing tasks with a shared handler.
///
/// At most `workers` handler invocations run concurrently. Tasks are
/// dequeued in insertion order; completion order is unspecified.
pub struct WorkerPool<T: Send + 'static> {
    workers: usize,
    shared: Arc<Shared<T>>,
    handler: Arc<dyn TaskHandler<T>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<T: Debug + Send + 'static> WorkerPool<T> {
    /// Creates an idle pool. No worker runs until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if `workers` is outside
    /// [`MIN_WORKERS`]..=[`MAX_WORKERS`].
    pub fn new<H>(name: impl Into<String>, workers: usize, handler: H) -> Result<Self, PoolError>
    where
        H: TaskHandler<T> + 'static,
    {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(PoolError::InvalidWorkerCount { value: workers });
        }

        let (outstanding, _) = watch::channel(0usize);
        let (shutdown, _) = shutdown_channel();
        Ok(Self {
            workers,
            shared: Arc::new(Shared {
                name: name.into(),
                backlog: Mutex::new(VecDeque::new()),
                available: Notify::new(),
                outstanding,
                shutdown,
                closed: AtomicBool::new(false),
                completed: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                cancelled: AtomicUsize::new(0),
            }),
            handler: Arc::new(handler),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    /// Diagnostic name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Appends `task` to the backlog without waiting for a free worker.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Stopped`] once [`stop`](Self::stop) has been called.
    pub fn enqueue(&self, task: T) -> Result<(), PoolError> {
        self.shared.enqueue(task)
    }

    /// Returns a cloneable sender feeding this pool's backlog.
    #[must_use]
    pub fn sender(&self) -> TaskSender<T> {
        TaskSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Tasks waiting in the backlog, not counting those in flight.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.shared.backlog().len()
    }

    /// Current outcome counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.shared.completed.load(Ordering::SeqCst),
            failed: self.shared.failed.load(Ordering::SeqCst),
            cancelled: self.shared.cancelled.load(Ordering::SeqCst),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the workers. Later calls are no-ops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running(_) => {
                debug!(pool = %self.name(), "start called on running pool, ignoring");
                return;
            }
            Lifecycle::Stopped => {
                warn!(pool = %self.name(), "start called on stopped pool, ignoring");
                return;
            }
        }

        let handles = (0..self.workers)
            .map(|worker| {
                let shared = Arc::clone(&self.shared);
                let handler = Arc::clone(&self.handler);
                let signal = self.shared.shutdown.signal();
                tokio::spawn(run_worker(worker, shared, handler, signal))
            })
            .collect();
        *lifecycle = Lifecycle::Running(handles);
        info!(pool = %self.name(), workers = self.workers, "worker pool started");
    }

    /// Waits until the backlog is empty and every accepted task has finished.
    ///
    /// Before [`start`](Self::start) or after [`stop`](Self::stop) this logs a
    /// warning and returns immediately.
    pub async fn join(&self) {
        if !matches!(*self.lifecycle(), Lifecycle::Running(_)) {
            warn!(pool = %self.name(), "join called on pool that is not running, ignoring");
            return;
        }

        let mut outstanding = self.shared.outstanding.subscribe();
        // The sender lives in `shared`, so this cannot observe a closed channel.
        let _ = outstanding.wait_for(|n| *n == 0).await;
        debug!(pool = %self.name(), stats = ?self.stats(), "worker pool drained");
    }

    /// Cancels all workers and waits for them to exit.
    ///
    /// Idle workers exit at once. A handler in flight is dropped at its next
    /// suspension point and counted as cancelled; a handler that never yields
    /// runs to completion. Tasks still in the backlog are discarded, and
    /// further [`enqueue`](Self::enqueue) calls fail.
    pub async fn stop(&self) {
        let handles = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(handles) => handles,
                previous @ Lifecycle::Idle => {
                    *lifecycle = previous;
                    warn!(pool = %self.name(), "stop called before start, ignoring");
                    return;
                }
                Lifecycle::Stopped => {
                    debug!(pool = %self.name(), "stop called twice, ignoring");
                    return;
                }
            }
        };

        {
            let _backlog = self.shared.backlog();
            self.shared.closed.store(true, Ordering::SeqCst);
        }
        self.shared.shutdown.trigger();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(pool = %self.name(), error = %e, "worker terminated abnormally");
            }
        }

        let discarded = {
            let mut backlog = self.shared.backlog();
            let count = backlog.len();
            backlog.clear();
            count
        };
        self.shared.mark_done(discarded);
        if discarded > 0 {
            warn!(pool = %self.name(), discarded, "discarded queued tasks on stop");
        }
        info!(pool = %self.name(), stats = ?self.stats(), "worker pool stopped");
    }
}

async fn next_task<T>(shared: &Shared<T>, signal: &ShutdownSignal) -> Option<T> {
    loop {
        if signal.is_triggered() {
            return None;
        }
        if let Some(task) = shared.pop() {
            return Some(task);
        }
        tokio::select! {
            () = shared.available.notified() => {}
            () = signal.cancelled() => return None,
        }
    }
}

async fn run_worker<T: Debug + Send + 'static>(
    worker: usize,
    shared: Arc<Shared<T>>,
    handler: Arc<dyn TaskHandler<T>>,
    signal: ShutdownSignal,
) {
    debug!(pool = %shared.name, worker, "worker started");

    while let Some(task) = next_task(&shared, &signal).await {
        let payload = format!("{task:?}");
        let outcome = tokio::select! {
            biased;
            () = signal.cancelled() => None,
            outcome = AssertUnwindSafe(handler.handle(task)).catch_unwind() => Some(outcome),
        };

        match outcome {
            Some(Ok(Ok(()))) => {
                shared.completed.fetch_add(1, Ordering::SeqCst);
            }
            Some(Ok(Err(e))) => {
                shared.failed.fetch_add(1, Ordering::SeqCst);
                error!(pool = %shared.name, worker, task = %payload, error = %format!("{e:#}"), "task failed");
            }
            Some(Err(panic)) => {
                shared.failed.fetch_add(1, Ordering::SeqCst);
                error!(pool = %shared.name, worker, task = %payload, panic = panic_message(&*panic), "task panicked");
            }
            None => {
                shared.cancelled.fetch_add(1, Ordering::SeqCst);
                warn!(pool = %shared.name, worker, task = %payload, "task cancelled by stop");
            }
        }
        shared.mark_done(1);
    }

    debug!(pool = %shared.name, worker, "worker exiting");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn noop_pool(workers: usize) -> Result<WorkerPool<u32>, PoolError> {
        WorkerPool::new("test", workers, |_n: u32| async { anyhow::Ok(()) })
    }

    #[test]
    fn test_pool_new_valid_worker_counts() {
        assert_eq!(noop_pool(1).unwrap().workers(), 1);
        assert_eq!(noop_pool(100).unwrap().workers(), 100);
    }

    #[test]
    fn test_pool_new_invalid_worker_counts() {
        assert_eq!(
            noop_pool(0).err(),
            Some(PoolError::InvalidWorkerCount { value: 0 })
        );
        assert_eq!(
            noop_pool(101).err(),
            Some(PoolError::InvalidWorkerCount { value: 101 })
        );
    }

    #[test]
    fn test_enqueue_before_start_is_accepted() {
        let pool = noop_pool(2).unwrap();
        pool.enqueue(1).unwrap();
        pool.enqueue(2).unwrap();
        assert_eq!(pool.backlog_len(), 2);
    }

    #[tokio::test]
    async fn test_join_and_stop_before_start_are_noops() {
        let pool = noop_pool(2).unwrap();
        pool.enqueue(7).unwrap();

        tokio::time::timeout(Duration::from_secs(1), pool.join())
            .await
            .unwrap();
        pool.stop().await;

        // Still idle: the task is kept and the pool still accepts work.
        assert_eq!(pool.backlog_len(), 1);
        pool.enqueue(8).unwrap();
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let pool = noop_pool(3).unwrap();
        pool.start();
        pool.start();
        match &*pool.lifecycle() {
            Lifecycle::Running(handles) => assert_eq!(handles.len(), 3),
            _ => panic!("pool should be running"),
        }
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*boxed), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }

    #[tokio::test]
    async fn test_sender_feeds_pool_from_another_task() {
        let pool = noop_pool(2).unwrap();
        pool.start();
        let sender = pool.sender();

        tokio::spawn(async move {
            for n in 0..10 {
                sender.enqueue(n).unwrap();
            }
        })
        .await
        .unwrap();

        pool.join().await;
        assert_eq!(pool.stats().completed, 10);
        pool.stop().await;
    }
}
