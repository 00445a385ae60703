//! Task execution infrastructure.
//!
//! This module provides the worker pool, the task tracking registry, and
//! the cooperative-cancellation contract task bodies implement.

pub mod pool;
pub mod registry;
pub mod task;
pub mod thread_factory;
pub mod worker;

pub use pool::TaskPool;
pub use task::{CancelFlag, CancellableTask, TaskId};
