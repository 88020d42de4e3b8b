//! Bounded background executor.
//!
//! A fixed pool of workers drains a bounded queue of named tasks. Each task
//! runs under its own deadline; panics and timeouts are recorded as task
//! outcomes instead of reaching the process.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::errors::{panic_message, RagError, RagResult};
use crate::domain::models::BackgroundConfig;

type TaskFuture = Pin<Box<dyn Future<Output = RagResult<()>> + Send + 'static>>;

struct Job {
    id: Uuid,
    name: String,
    deadline: Duration,
    future: TaskFuture,
}

/// Identifies a submitted task in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: Uuid,
    pub name: String,
}

/// Executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Tasks accepted into the queue.
    pub submitted: u64,
    /// Tasks that returned `Ok`.
    pub succeeded: u64,
    /// Tasks that returned an error.
    pub failed: u64,
    /// Tasks that panicked.
    pub panicked: u64,
    /// Tasks cut off by their deadline.
    pub timed_out: u64,
}

impl ExecutorStats {
    /// Tasks that have finished in any way.
    pub const fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.panicked + self.timed_out
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    timed_out: AtomicU64,
}

pub struct BackgroundExecutor {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    default_deadline: Duration,
}

impl BackgroundExecutor {
    /// Spawn the worker pool. Must be called inside a Tokio runtime.
    pub fn new(config: &BackgroundConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else {
                            debug!(worker, "Background worker stopping");
                            break;
                        };
                        run_job(job, &counters).await;
                    }
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
            default_deadline: Duration::from_secs(config.task_deadline_secs),
        }
    }

    /// Queue a task, waiting for room when the queue is full.
    pub async fn submit<F>(&self, name: impl Into<String>, task: F) -> RagResult<TaskHandle>
    where
        F: Future<Output = RagResult<()>> + Send + 'static,
    {
        self.submit_with_deadline(name, self.default_deadline, task).await
    }

    pub async fn submit_with_deadline<F>(
        &self,
        name: impl Into<String>,
        deadline: Duration,
        task: F,
    ) -> RagResult<TaskHandle>
    where
        F: Future<Output = RagResult<()>> + Send + 'static,
    {
        let sender = self.sender()?;
        let (job, handle) = job(name.into(), deadline, Box::pin(task));
        sender.send(job).await.map_err(|_| RagError::QueueClosed)?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Queue a task or fail immediately when the queue is full or closed.
    pub fn try_submit<F>(&self, name: impl Into<String>, task: F) -> RagResult<TaskHandle>
    where
        F: Future<Output = RagResult<()>> + Send + 'static,
    {
        let sender = self.sender()?;
        let (job, handle) = job(name.into(), self.default_deadline, Box::pin(task));
        match sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(handle)
            }
            Err(TrySendError::Full(job)) => {
                warn!(task = %job.name, "Background queue full, rejecting task");
                Err(RagError::QueueClosed)
            }
            Err(TrySendError::Closed(_)) => Err(RagError::QueueClosed),
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work, let queued tasks finish, and join the workers.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Background worker ended abnormally");
            }
        }
    }

    fn sender(&self) -> RagResult<mpsc::Sender<Job>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RagError::QueueClosed)
    }
}

fn job(name: String, deadline: Duration, future: TaskFuture) -> (Job, TaskHandle) {
    let id = Uuid::new_v4();
    let handle = TaskHandle {
        id,
        name: name.clone(),
    };
    (
        Job {
            id,
            name,
            deadline,
            future,
        },
        handle,
    )
}

async fn run_job(job: Job, counters: &Counters) {
    let span = info_span!("background_task", task_id = %job.id, task = %job.name);
    async move {
        let outcome = tokio::time::timeout(job.deadline, AssertUnwindSafe(job.future).catch_unwind()).await;
        match outcome {
            Ok(Ok(Ok(()))) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!("Background task finished");
            }
            Ok(Ok(Err(e))) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Background task failed");
            }
            Ok(Err(payload)) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                error!(panic = %panic_message(payload.as_ref()), "Background task panicked");
            }
            Err(_) => {
                counters.timed_out.fetch_add(1, Ordering::Relaxed);
                warn!(deadline_secs = job.deadline.as_secs(), "Background task timed out");
            }
        }
    }
    .instrument(span)
    .await;
}
