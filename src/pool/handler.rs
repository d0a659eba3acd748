//! The contract between a worker pool and the code that processes its tasks.

use std::future::Future;

use async_trait::async_trait;

/// Processes one task taken from a [`WorkerPool`](super::WorkerPool) backlog.
///
/// An `Err` (or a panic) is confined to the task that produced it: the pool
/// logs it with the task payload and the worker moves on to the next task.
#[async_trait]
pub trait TaskHandler<T: Send + 'static>: Send + Sync {
    /// Handles a single task.
    async fn handle(&self, task: T) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, F, Fut> TaskHandler<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, task: T) -> anyhow::Result<()> {
        (self)(task).await
    }
}
