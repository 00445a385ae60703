//! BACKPLANE - background task execution for interactive applications
//!
//! A process-wide, bounded worker pool that keeps long-running work (file
//! ingestion, surface construction, rendering, numerical analysis) off the
//! thread driving the user interface, tracks everything in flight, and
//! supports bulk cooperative cancellation.
//!
//! # Quick Start
//!
//! ```no_run
//! use backplane::{CancelFlag, CancellableTask};
//! use std::sync::Arc;
//!
//! struct Triangulate {
//!     cancelled: CancelFlag,
//! }
//!
//! impl CancellableTask for Triangulate {
//!     fn run(&self) {
//!         while !self.cancelled.is_cancelled() {
//!             // insert the next vertex batch...
//!             # break;
//!         }
//!     }
//!     fn cancel(&self) {
//!         self.cancelled.cancel();
//!     }
//!     fn is_cancelled(&self) -> bool {
//!         self.cancelled.is_cancelled()
//!     }
//! }
//!
//! // Fire and forget; the task is tracked until it finishes.
//! backplane::submit_cancellable(Arc::new(Triangulate {
//!     cancelled: CancelFlag::new(),
//! })).unwrap();
//!
//! // The user picked a different model: stop everything.
//! backplane::cancel_all();
//! ```
//!
//! # Design
//!
//! - **Bounded concurrency**: the worker count is derived from hardware
//!   concurrency but always leaves headroom for the interface thread
//!   (never more than 4 workers).
//! - **Cooperative cancellation**: [`cancel_all`] sets a monotonic flag on
//!   every tracked task; bodies poll it at safe points and exit
//!   voluntarily. Nothing is ever preempted.
//! - **Fire and forget**: submission returns immediately; failures inside
//!   a task body are isolated to that task and reported through `tracing`.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod runtime;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{CancelFlag, CancellableTask, TaskId, TaskPool};
pub use runtime::{cancel_all, global, pool_size, submit, submit_cancellable};
