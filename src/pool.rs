//! Fixed-size pool of tokio workers draining a queue of independent tasks.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// A unit of work. Tasks record their own outcome; the pool only runs them.
pub struct Task {
    pub id: usize,
    exec: BoxFuture<'static, ()>,
}

impl Task {
    pub fn new<F>(id: usize, exec: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            id,
            exec: exec.boxed(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every task exactly once and returns when all of them have finished.
    ///
    /// The queue is closed before the workers start, so each worker exits as
    /// soon as it finds the queue empty.
    pub async fn run(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }

        let total = tasks.len();
        let (tx, rx) = mpsc::unbounded_channel();
        for task in tasks {
            // The receiver is alive until the workers below are done.
            let _ = tx.send(task);
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let workers = self.concurrency.min(total);
        debug!(tasks = total, workers, "starting worker pool");

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let rx = rx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(task) = next else {
                        break;
                    };
                    let task_id = task.id;
                    debug!(worker_id, task_id, "running task");
                    if AssertUnwindSafe(task.exec).catch_unwind().await.is_err() {
                        error!(worker_id, task_id, "task panicked");
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("worker terminated abnormally: {}", e);
            }
        }
    }
}
