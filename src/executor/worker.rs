//! Worker thread loop.

use super::registry::TaskRegistry;
use super::task::{Task, TaskState, Tracked};
use crossbeam_deque::{Injector, Steal};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

pub(crate) struct Worker {
    pub(crate) id: usize,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self { id }
    }

    // main loop
    pub(crate) fn run(
        &self,
        injector: Arc<Injector<Task>>,
        registry: Arc<TaskRegistry>,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut backoff_cnt = 0;

        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            if let Some(task) = self.find_task(&injector) {
                backoff_cnt = 0;
                self.execute_task(task, &registry);
            } else {
                // nothing to do, backoff
                self.backoff(&mut backoff_cnt);
            }
        }
    }

    fn find_task(&self, injector: &Injector<Task>) -> Option<Task> {
        loop {
            match injector.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    fn execute_task(&self, task: Task, registry: &TaskRegistry) {
        match task {
            Task::Untracked { id, func } => {
                if catch_unwind(AssertUnwindSafe(func)).is_err() {
                    error!(worker = self.id, %id, "untracked task panicked");
                }
            }
            Task::Tracked(tracked) => self.execute_tracked(tracked, registry),
        }
    }

    fn execute_tracked(&self, tracked: Arc<Tracked>, registry: &TaskRegistry) {
        // A task signalled while still queued is dropped here instead of
        // being run; this is the queue-removal half of the cancellation
        // sweep. A task that already won the race to Running falls through
        // and is left to observe its own flag.
        if tracked.body.is_cancelled() && tracked.state.try_cancel_before_start() {
            debug!(worker = self.id, id = %tracked.id, "discarding cancelled task before start");
            registry.remove(tracked.id);
            return;
        }

        if !tracked.state.try_start() {
            // Lost the Queued -> Running race to a cancellation sweep.
            registry.remove(tracked.id);
            return;
        }

        let result = catch_unwind(AssertUnwindSafe(|| tracked.body.run()));

        let terminal = match &result {
            Ok(()) if tracked.body.is_cancelled() => TaskState::CancelledWhileRunning,
            Ok(()) => TaskState::Completed,
            Err(_) => TaskState::Failed,
        };
        tracked.state.finish(terminal);

        // Completion hook: the only exit from the registry besides the
        // cancellation sweep.
        registry.remove(tracked.id);

        if let Err(payload) = result {
            error!(
                worker = self.id,
                id = %tracked.id,
                panic = %panic_message(&payload),
                "task body panicked"
            );
        }
    }

    fn backoff(&self, count: &mut u32) {
        const MAX_SPINS: u32 = 10;
        const MAX_YIELDS: u32 = 20;

        *count += 1;

        if *count <= MAX_SPINS {
            let spins = (*count).min(6);
            for _ in 0..(1 << spins) {
                std::hint::spin_loop();
            }
        } else if *count <= MAX_YIELDS {
            thread::yield_now();
        } else {
            thread::park_timeout(Duration::from_micros(100));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
