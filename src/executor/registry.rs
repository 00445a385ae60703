//! Synchronized set of currently tracked cancellable tasks.

use super::task::{TaskId, Tracked};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The tracking set for queued and running cancellable tasks.
///
/// A task is present exactly from its submission until it reaches a
/// terminal state or is swept by [`drain_for_cancel`]. Only the pool and
/// its workers touch the registry; everything happens under the one
/// internal lock so "currently tracked" reads consistently from any
/// thread.
///
/// [`drain_for_cancel`]: TaskRegistry::drain_for_cancel
pub(crate) struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Arc<Tracked>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Add a task if not already present.
    pub(crate) fn insert(&self, task: Arc<Tracked>) {
        self.tasks.lock().entry(task.id).or_insert(task);
    }

    /// Remove a task after it reaches a terminal state. No-op if the task
    /// was already swept by a cancellation pass.
    pub(crate) fn remove(&self, id: TaskId) {
        self.tasks.lock().remove(&id);
    }

    /// Signal every tracked task, then clear the registry, all within a
    /// single lock acquisition. Returns the signalled tasks so the caller
    /// can do post-sweep work outside the critical section.
    pub(crate) fn drain_for_cancel(&self) -> Vec<Arc<Tracked>> {
        let mut tasks = self.tasks.lock();
        let drained: Vec<Arc<Tracked>> = tasks.drain().map(|(_, t)| t).collect();
        for task in &drained {
            task.body.cancel();
        }
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
