use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::completion::{CompletionClient, CompletionError, Message};

struct Job {
    run: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
    pause_after: Duration,
}

/// Single-lane FIFO in front of the completion API.
///
/// One worker task owns the receiving end and runs jobs one at a time, so at
/// most one request is in flight. Jobs cannot be cancelled once queued.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Job>,
    processing: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
    persistent_delay: Duration,
}

impl RequestQueue {
    /// Starts the worker. `persistent_delay` is awaited after each job
    /// pushed through [`RequestQueue::enqueue`].
    pub fn spawn(persistent_delay: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let processing = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_processing = processing.clone();
        let worker_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                worker_processing.store(true, Ordering::SeqCst);

                // A panicking job only takes down its own task.
                if let Err(e) = tokio::spawn((job.run)()).await {
                    error!("Queued request panicked: {}", e);
                }

                if !job.pause_after.is_zero() {
                    tokio::time::sleep(job.pause_after).await;
                }

                worker_pending.fetch_sub(1, Ordering::SeqCst);
                worker_processing.store(false, Ordering::SeqCst);
            }
            debug!("Request queue closed");
        });

        Self {
            tx,
            processing,
            pending,
            persistent_delay,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn push(&self, job: Job) -> Result<(), CompletionError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(job).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            CompletionError::QueueClosed
        })
    }

    /// Queues `task` and waits for its own result. A failure rejects only
    /// this caller; the queue keeps draining.
    pub async fn submit<F, Fut, T>(&self, task: F) -> Result<T, CompletionError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CompletionError>> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        self.push(Job {
            run: Box::new(move || {
                async move {
                    let result = task().await;
                    // caller may have stopped waiting
                    let _ = done_tx.send(result);
                }
                .boxed()
            }),
            pause_after: Duration::ZERO,
        })?;

        done_rx.await.map_err(|_| CompletionError::QueueClosed)?
    }

    /// Fire-and-forget. Failures are logged and the configured delay is
    /// awaited before the next job starts.
    pub fn enqueue<F, Fut>(&self, task: F) -> Result<(), CompletionError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CompletionError>> + Send + 'static,
    {
        self.push(Job {
            run: Box::new(move || {
                async move {
                    if let Err(e) = task().await {
                        warn!("Queued request failed: {}", e);
                    }
                }
                .boxed()
            }),
            pause_after: self.persistent_delay,
        })
    }

    pub async fn complete(
        &self,
        client: &CompletionClient,
        messages: Vec<Message>,
    ) -> Result<String, CompletionError> {
        let client = client.clone();
        self.submit(move || async move { client.complete(messages).await })
            .await
    }
}
