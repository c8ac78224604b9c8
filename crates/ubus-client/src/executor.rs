//! Callback execution contexts.
//!
//! Every listener and lifecycle callback the application sees is marshaled
//! onto a [`CallbackExecutor`], never run on the transport's thread.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

/// Execution context for application callbacks.
pub trait CallbackExecutor: Send + Sync {
    fn execute(&self, task: BoxFuture<'static, ()>);
}

enum Job {
    Run(BoxFuture<'static, ()>),
    Barrier(oneshot::Sender<()>),
}

/// Runs callbacks one at a time, in submission order, on a single worker task.
///
/// A panicking callback is logged and does not stop the worker.
pub struct SerialExecutor {
    jobs: mpsc::UnboundedSender<Job>,
}

impl SerialExecutor {
    /// Spawn the worker on `handle`.
    pub fn new(handle: &Handle) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        handle.spawn(async move {
            while let Some(job) = queue.recv().await {
                match job {
                    Job::Run(task) => {
                        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                            error!("Callback panicked");
                        }
                    }
                    Job::Barrier(done) => {
                        let _ = done.send(());
                    }
                }
            }
            trace!("Serial executor stopped");
        });
        Self { jobs }
    }

    /// Resolves once every task submitted before this call has run.
    pub async fn idle(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Barrier(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl CallbackExecutor for SerialExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        if self.jobs.send(Job::Run(task)).is_err() {
            error!("Serial executor worker is gone, dropping callback");
        }
    }
}

/// Spawns each callback as its own task; callbacks may run concurrently.
pub struct PooledExecutor {
    handle: Handle,
}

impl PooledExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl CallbackExecutor for PooledExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(async move {
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                error!("Callback panicked");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_serial_preserves_order() {
        let executor = SerialExecutor::new(&Handle::current());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = seen.clone();
            executor.execute(Box::pin(async move {
                tokio::task::yield_now().await;
                seen.lock().push(i);
            }));
        }
        executor.idle().await;

        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_serial_survives_panicking_callback() {
        let executor = SerialExecutor::new(&Handle::current());
        let ran = Arc::new(Mutex::new(false));

        executor.execute(Box::pin(async { panic!("listener bug") }));
        let flag = ran.clone();
        executor.execute(Box::pin(async move { *flag.lock() = true }));
        executor.idle().await;

        assert!(*ran.lock());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pooled_runs_tasks() {
        let executor = PooledExecutor::new(Handle::current());
        let (tx, rx) = oneshot::channel();
        executor.execute(Box::pin(async move {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.await.unwrap(), 7);
    }
}
