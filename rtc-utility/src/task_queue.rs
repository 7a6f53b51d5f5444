use log::debug;
use shared::error::Result;
use std::thread;
use std::time::Duration;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

/// A dedicated worker thread running posted tasks one at a time.
///
/// Tasks run on a current-thread runtime, so a task never overlaps with
/// another one. Dropping the queue discards everything still pending and
/// joins the worker.
pub(crate) struct TaskQueue {
    name: String,
    handle: TaskQueueHandle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

/// Cloneable handle used to post onto a [`TaskQueue`] from any thread.
///
/// Posting after the queue has shut down is a silent no-op.
#[derive(Clone)]
pub(crate) struct TaskQueueHandle {
    handle: Handle,
}

impl TaskQueue {
    pub(crate) fn new(name: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        let handle = TaskQueueHandle {
            handle: runtime.handle().clone(),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                runtime.block_on(async move {
                    let _ = shutdown_rx.await;
                });
            })?;

        debug!("task queue {name} started");

        Ok(TaskQueue {
            name: name.to_owned(),
            handle,
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn handle(&self) -> TaskQueueHandle {
        self.handle.clone()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            // Joining from the worker itself would never return.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
        debug!("task queue {} stopped", self.name);
    }
}

impl TaskQueueHandle {
    /// Runs `task` on the worker as soon as it is free.
    pub(crate) fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move {
            task();
        });
    }

    /// Runs `task` on the worker once `delay` has elapsed.
    pub(crate) fn post_delayed_task<F>(&self, task: F, delay: Duration)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
