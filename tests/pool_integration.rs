//! Integration tests for worker pool dispatch, isolation and shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use harvester_core::{PoolError, TaskHandler, WorkerPool};

/// Records every task it sees and tracks peak concurrency.
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<u32>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl RecordingHandler {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn seen(&self) -> Vec<u32> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort_unstable();
        seen
    }
}

/// Lets the test keep a handle on the handler the pool owns.
struct Shared(Arc<RecordingHandler>);

#[async_trait]
impl TaskHandler<u32> for Shared {
    async fn handle(&self, task: u32) -> anyhow::Result<()> {
        self.0.record(task).await
    }
}

impl RecordingHandler {
    async fn record(&self, task: u32) -> anyhow::Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.seen.lock().unwrap().push(task);
        self.active.fetch_sub(1, Ordering::SeqCst);

        match task {
            13 => bail!("task {task} is unlucky"),
            666 => panic!("task {task} panicked"),
            _ => Ok(()),
        }
    }
}

#[tokio::test]
async fn test_three_tasks_two_workers_each_handled_once() {
    let handler = Arc::new(RecordingHandler::with_delay(Duration::from_millis(10)));
    let pool = WorkerPool::new("pages", 2, Shared(Arc::clone(&handler))).unwrap();

    pool.start();
    for task in [1, 2, 3] {
        pool.enqueue(task).unwrap();
    }
    pool.join().await;
    pool.stop().await;

    assert_eq!(handler.seen(), vec![1, 2, 3]);
    assert_eq!(pool.stats().completed, 3);
    assert!(handler.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_worker_count() {
    let handler = Arc::new(RecordingHandler::with_delay(Duration::from_millis(20)));
    let pool = WorkerPool::new("bounded", 4, Shared(Arc::clone(&handler))).unwrap();

    for task in 0..20 {
        pool.enqueue(task).unwrap();
    }
    pool.start();
    pool.join().await;
    pool.stop().await;

    let peak = handler.peak.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency {peak} exceeded worker count");
    assert!(peak > 1, "tasks should overlap across workers");
    assert_eq!(handler.seen(), (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_failing_and_panicking_tasks_do_not_stop_the_pool() {
    let handler = Arc::new(RecordingHandler::default());
    let pool = WorkerPool::new("isolation", 2, Shared(Arc::clone(&handler))).unwrap();

    pool.start();
    for task in [1, 13, 666, 4, 5] {
        pool.enqueue(task).unwrap();
    }
    pool.join().await;

    let stats = pool.stats();
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.failed, 2);
    assert_eq!(handler.seen(), vec![1, 4, 5, 13, 666]);

    // Workers survive and keep serving new tasks.
    pool.enqueue(6).unwrap();
    pool.join().await;
    pool.stop().await;
    assert_eq!(pool.stats().completed, 4);
}

#[tokio::test]
async fn test_stop_cancels_in_flight_task_and_discards_backlog() {
    let handler = Arc::new(RecordingHandler::with_delay(Duration::from_secs(10)));
    let pool = WorkerPool::new("stopping", 1, Shared(Arc::clone(&handler))).unwrap();

    pool.start();
    for task in 1..=5 {
        pool.enqueue(task).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(handler.active.load(Ordering::SeqCst), 1);

    tokio::time::timeout(Duration::from_secs(2), pool.stop())
        .await
        .expect("stop should not wait out a suspended handler");

    assert!(handler.seen().is_empty());
    let stats = pool.stats();
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.processed(), 1);
    assert_eq!(pool.backlog_len(), 0);
    assert_eq!(
        pool.enqueue(6),
        Err(PoolError::Stopped {
            name: "stopping".to_string()
        })
    );
}

#[tokio::test]
async fn test_stop_unblocks_idle_workers() {
    let handler = Arc::new(RecordingHandler::default());
    let pool = WorkerPool::new("idle", 8, Shared(Arc::clone(&handler))).unwrap();

    pool.start();
    tokio::time::timeout(Duration::from_secs(1), pool.stop())
        .await
        .expect("idle workers should exit promptly");

    assert_eq!(pool.stats().processed(), 0);
}

#[tokio::test]
async fn test_join_returns_once_stop_drains_backlog() {
    let handler = Arc::new(RecordingHandler::with_delay(Duration::from_millis(50)));
    let pool = Arc::new(WorkerPool::new("interrupted", 1, Shared(Arc::clone(&handler))).unwrap());

    pool.start();
    for task in 1..=10 {
        pool.enqueue(task).unwrap();
    }

    let stopper = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            pool.stop().await;
        })
    };

    tokio::time::timeout(Duration::from_secs(2), pool.join())
        .await
        .expect("join should return after stop");
    stopper.await.unwrap();

    assert!(handler.seen().len() < 10);
}
