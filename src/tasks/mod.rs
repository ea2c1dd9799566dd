//! # Task abstractions and the serializing throttler.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for deferred one-shot async work
//! - [`TaskFn`] - closure-backed task implementation
//! - [`BoxTask`], [`BoxTaskFuture`] - boxed forms used by the queue
//! - [`Throttler`] - runs queued tasks one at a time, FIFO
//! - [`Ticket`] - per-caller future resolving with that caller's result

mod task;
mod throttler;

pub use task::{BoxTask, BoxTaskFuture, Task, TaskFn};
pub use throttler::{Throttler, Ticket};
