//! The bounded worker pool.

use super::registry::TaskRegistry;
use super::task::{CancellableTask, Task, TaskId, Tracked};
use super::thread_factory::WorkerThreadFactory;
use super::worker::Worker;
use crate::config::Config;
use crate::error::{Error, Result};
use crossbeam_deque::Injector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// A fixed-size worker pool with in-flight task tracking and bulk
/// cooperative cancellation.
///
/// Submission is fire-and-forget: execution is asynchronous and nothing
/// is returned to the caller on completion. Tasks implementing
/// [`CancellableTask`] are tracked from submission until they finish for
/// any reason, and [`cancel_all`] signals every tracked task at once.
/// Cancellation is advisory; a running body keeps the worker until it
/// observes its flag and returns.
///
/// One process-wide instance is available through
/// [`crate::runtime::global`]; pools can also be constructed directly and
/// passed around explicitly, which is what the tests do.
///
/// [`cancel_all`]: TaskPool::cancel_all
pub struct TaskPool {
    workers: Vec<WorkerHandle>,
    injector: Arc<Injector<Task>>,
    registry: Arc<TaskRegistry>,
    shutdown: Arc<AtomicBool>,
    pool_size: usize,
}

struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
}

impl TaskPool {
    /// Create a pool sized per the configuration and start its workers.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let pool_size = config.worker_threads();
        let injector = Arc::new(Injector::new());
        let registry = Arc::new(TaskRegistry::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let factory = WorkerThreadFactory::new(&config.thread_name_prefix, config.stack_size);

        let mut workers = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let worker = Worker::new(id);
            let injector_clone = injector.clone();
            let registry_clone = registry.clone();
            let shutdown_clone = shutdown.clone();

            let thread = factory
                .builder()
                .spawn(move || {
                    worker.run(injector_clone, registry_clone, shutdown_clone);
                })
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            let unparker = thread.thread().clone();
            workers.push(WorkerHandle {
                thread: Some(thread),
                unparker,
            });
        }

        Ok(Self {
            workers,
            injector,
            registry,
            shutdown,
            pool_size,
        })
    }

    /// Submit a plain unit of work. It runs untracked: `cancel_all` will
    /// not see it.
    pub fn submit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }

        self.injector.push(Task::Untracked {
            id: TaskId::next(),
            func: Box::new(f),
        });
        self.wake_workers();
        Ok(())
    }

    /// Submit a cancellable task. The task enters the registry before it
    /// is handed to the work queue, so a `cancel_all` racing with this
    /// call either signals the task or misses it entirely, never
    /// half-tracks it.
    pub fn submit_cancellable(&self, body: Arc<dyn CancellableTask>) -> Result<TaskId> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }

        let tracked = Tracked::new(body);
        let id = tracked.id;

        self.registry.insert(tracked.clone());
        tracked.state.mark_queued();
        self.injector.push(Task::Tracked(tracked));
        self.wake_workers();

        debug!(%id, "submitted cancellable task");
        Ok(id)
    }

    /// Signal every tracked task and empty the registry.
    ///
    /// The signal-and-clear happens in one registry critical section, so
    /// the registry is observably empty the moment this returns. After the
    /// lock is released, tasks that have not started are discarded from
    /// the pending queue best-effort: one that slips into Running during
    /// the window keeps its worker, already signalled, until it observes
    /// its own flag. Idempotent; a no-op on an empty registry.
    pub fn cancel_all(&self) {
        let cancelled = self.registry.drain_for_cancel();
        if cancelled.is_empty() {
            return;
        }

        let mut discarded = 0usize;
        for task in &cancelled {
            if task.state.try_cancel_before_start() {
                discarded += 1;
            }
        }

        debug!(
            signalled = cancelled.len(),
            discarded, "cancellation sweep complete"
        );
    }

    /// The configured worker count.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of cancellable tasks currently tracked (queued or running).
    pub fn tracked_tasks(&self) -> usize {
        self.registry.len()
    }

    fn wake_workers(&self) {
        for worker in &self.workers {
            worker.unparker.unpark();
        }
    }

    /// Stop the workers and join them. Queued work that has not started
    /// is dropped; running bodies finish on their own terms first.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        // wake everyone up to check the shutdown flag
        for worker in &self.workers {
            worker.unparker.unpark();
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("pool_size", &self.pool_size)
            .field("tracked_tasks", &self.registry.len())
            .finish_non_exhaustive()
    }
}
