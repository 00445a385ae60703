//! Process-wide pool instance.
//!
//! The application-facing surface is a single pool shared by everything
//! that needs background execution. It is created lazily on first access
//! with the default configuration and lives until process teardown; there
//! is no explicit destruction. Code that wants an isolated pool (tests,
//! embedders) constructs a [`TaskPool`] directly instead.

use crate::config::Config;
use crate::error::Result;
use crate::executor::{CancellableTask, TaskId, TaskPool};
use std::sync::{Arc, OnceLock};

static GLOBAL_POOL: OnceLock<Arc<TaskPool>> = OnceLock::new();

/// The process-wide pool, created on first access.
pub fn global() -> &'static Arc<TaskPool> {
    GLOBAL_POOL.get_or_init(|| {
        let pool = TaskPool::new(&Config::default())
            .expect("failed to start the process-wide worker pool");
        Arc::new(pool)
    })
}

/// Submit a plain unit of work to the process-wide pool.
pub fn submit<F>(f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    global().submit(f)
}

/// Submit a cancellable task to the process-wide pool.
pub fn submit_cancellable(body: Arc<dyn CancellableTask>) -> Result<TaskId> {
    global().submit_cancellable(body)
}

/// Signal and discard all tracked work on the process-wide pool.
pub fn cancel_all() {
    global().cancel_all();
}

/// Configured worker count of the process-wide pool.
pub fn pool_size() -> usize {
    global().pool_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_pool_is_lazy_and_stable() {
        let first = Arc::as_ptr(global());
        let second = Arc::as_ptr(global());
        assert_eq!(first, second);
        assert!(pool_size() >= 1);
    }

    #[test]
    fn test_global_submit_and_cancel() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (tx, rx) = mpsc::channel();
        submit(move || {
            tx.send(()).unwrap();
        })
        .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Sweeping an idle pool is a silent no-op.
        cancel_all();
    }
}
