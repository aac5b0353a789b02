use futures::future::join_all;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::errors::ScanError;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Fixed set of workers draining a bounded task queue.
///
/// `submit` waits while the queue is full. Each task runs on its own spawned
/// task so a panic is counted as an error instead of killing the worker.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    completed: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let completed = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let workers = (0..workers.max(1))
            .map(|id| {
                let receiver = receiver.clone();
                let completed = completed.clone();
                let errors = errors.clone();
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };
                        match tokio::spawn(job).await {
                            Ok(()) => {
                                completed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                errors.fetch_add(1, Ordering::Relaxed);
                                tracing::warn!(worker = id, error = %e, "scan task failed");
                            }
                        }
                    }
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
            completed,
            errors,
        }
    }

    /// Queue a task, waiting for room if the queue is full.
    pub async fn submit<F>(&self, task: F) -> Result<(), ScanError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(ScanError::PoolStopped)?;
        sender.send(Box::pin(task)).await.map_err(|_| ScanError::PoolStopped)
    }

    /// Stop accepting tasks and wait for everything queued or running to
    /// finish. Returns (completed, failed).
    pub async fn stop_and_wait(&mut self) -> (usize, usize) {
        drop(self.sender.take());
        for joined in join_all(self.workers.drain(..)).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "worker exited abnormally");
            }
        }
        self.get_stats()
    }

    pub fn get_stats(&self) -> (usize, usize) {
        (
            self.completed.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}
