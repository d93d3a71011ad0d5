//! # Concurrency Limiter
//!
//! Caps how many submitted futures run at once.
//!
//! ```text
//! submit() ──> mpsc queue ──> dispatcher ──(fair permit)──> tokio::spawn
//!    │                                                         │
//!    └──────────────── TaskHandle <── oneshot <────────────────┘
//! ```
//!
//! A single dispatcher task drains the queue in submission order and waits
//! for a semaphore permit before spawning each job, so jobs *start* in FIFO
//! order. The permit travels with the spawned task and is released when it
//! finishes, panics included.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, error};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimiterError {
    /// The task panicked or was dropped before producing a value.
    #[error("task aborted before completion")]
    TaskAborted,
}

type Job = BoxFuture<'static, ()>;

/// Bounded-concurrency task runner.
///
/// Must be created inside a tokio runtime. Dropping the limiter stops
/// admission after the already queued jobs have been dispatched.
pub struct ConcurrencyLimiter {
    queue: mpsc::UnboundedSender<Job>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `capacity` concurrent tasks (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let permits = Arc::new(Semaphore::new(capacity));
        let (queue, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let permit = match permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let _permit = permit;
                    job.await;
                });
            }
            debug!("Limiter dispatcher stopped");
        });

        Self { queue, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue `task`. It starts once every earlier submission has started and
    /// a slot is free. The returned handle resolves with its output.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job = async move {
            let output = task.await;
            let _ = tx.send(output);
        }
        .boxed();

        if self.queue.send(job).is_err() {
            // Dispatcher is gone; the job (and its sender) was dropped, so the
            // handle resolves to TaskAborted.
            error!("Limiter dispatcher is not running, task rejected");
        }

        TaskHandle { rx }
    }
}

/// Completion handle for a submitted task.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, LimiterError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| LimiterError::TaskAborted))
    }
}
