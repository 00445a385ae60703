//! Deterministic naming for worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Produces worker threads named `<prefix>_<sequence>` with a strictly
/// increasing sequence scoped to the factory instance.
///
/// The names exist so a thread dump or log line can be traced back to the
/// pool that owns the thread; they have no effect on scheduling.
pub(crate) struct WorkerThreadFactory {
    prefix: String,
    serial: AtomicUsize,
    stack_size: Option<usize>,
}

impl WorkerThreadFactory {
    pub(crate) fn new(prefix: &str, stack_size: Option<usize>) -> Self {
        Self {
            prefix: prefix.to_string(),
            serial: AtomicUsize::new(0),
            stack_size,
        }
    }

    pub(crate) fn next_name(&self) -> String {
        let index = self.serial.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}", self.prefix, index)
    }

    /// A `thread::Builder` carrying the next name in the sequence.
    pub(crate) fn builder(&self) -> thread::Builder {
        let mut builder = thread::Builder::new().name(self.next_name());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}
