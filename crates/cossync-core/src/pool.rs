//! Bounded work queue and fixed-size worker pool.
//!
//! ```text
//! enumerator ──send──▶ [ bounded queue (100) ] ──recv──▶ worker 0..3 ──▶ ObjectStore
//! ```
//!
//! The producer blocks when the queue is full. Closing the queue is the only
//! termination signal: workers drain whatever is left and exit. Each worker
//! keeps its own [`BatchSummary`]; [`WorkerPool::finish`] joins them all and
//! merges the results.

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::summary::{BatchSummary, ItemResult};

/// Number of concurrent transfer workers.
pub const WORKER_COUNT: usize = 3;

/// Capacity of the work queue.
pub const QUEUE_CAPACITY: usize = 100;

/// Executes one task. Implementations log their own outcome.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync + 'static {
    /// Perform the task and describe what happened.
    async fn handle(&self, task: &T) -> ItemResult;

    /// Describe a task abandoned because the run was cancelled mid-flight.
    fn cancelled(&self, task: &T) -> ItemResult;
}

/// A running pool of workers consuming a bounded queue.
#[derive(Debug)]
pub struct WorkerPool<T> {
    queue: Sender<T>,
    workers: Vec<JoinHandle<BatchSummary>>,
}

impl<T: Send + Sync + 'static> WorkerPool<T> {
    /// Spawn [`WORKER_COUNT`] workers behind a queue of [`QUEUE_CAPACITY`].
    pub fn spawn<H>(handler: Arc<H>, cancel: &CancellationToken) -> Self
    where
        H: TaskHandler<T>,
    {
        Self::with_limits(handler, WORKER_COUNT, QUEUE_CAPACITY, cancel)
    }

    /// Spawn `workers` workers behind a queue of `capacity` slots.
    pub fn with_limits<H>(
        handler: Arc<H>,
        workers: usize,
        capacity: usize,
        cancel: &CancellationToken,
    ) -> Self
    where
        H: TaskHandler<T>,
    {
        let (queue, tasks) = async_channel::bounded::<T>(capacity.max(1));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let tasks = tasks.clone();
                let handler = Arc::clone(&handler);
                let cancel = cancel.clone();
                tokio::spawn(run_worker(worker_id, tasks, handler, cancel))
            })
            .collect();

        // Only workers hold receivers, so the queue closes if they all exit.
        drop(tasks);

        Self { queue, workers }
    }

    /// The producer side of the queue.
    #[must_use]
    pub fn queue(&self) -> &Sender<T> {
        &self.queue
    }

    /// Close the queue, wait for every worker to drain it and merge their
    /// summaries.
    pub async fn finish(self) -> BatchSummary {
        self.queue.close();

        let mut summary = BatchSummary::default();
        for joined in join_all(self.workers).await {
            match joined {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => error!(error = %e, "transfer worker panicked"),
            }
        }
        summary
    }
}

async fn run_worker<T, H>(
    worker_id: usize,
    tasks: Receiver<T>,
    handler: Arc<H>,
    cancel: CancellationToken,
) -> BatchSummary
where
    T: Send + Sync + 'static,
    H: TaskHandler<T>,
{
    let mut summary = BatchSummary::default();

    loop {
        let task = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = tasks.recv() => match received {
                Ok(task) => task,
                // Closed and drained.
                Err(_) => break,
            },
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => handler.cancelled(&task),
            result = handler.handle(&task) => result,
        };
        summary.record(result);
    }

    debug!(
        worker_id,
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        "transfer worker finished"
    );
    summary
}
