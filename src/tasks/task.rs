//! # Task abstraction.
//!
//! A [`Task`] is a one-shot unit of asynchronous work that yields a value of
//! type `R`. Nothing runs until the throttler calls [`Task::spawn`], so a task is
//! effectively a *factory* for its future.
//!
//! The common boxed form is [`BoxTask`], suitable for queueing.

use std::future::Future;

use futures::future::BoxFuture;

/// Boxed future produced by a task.
pub type BoxTaskFuture<R> = BoxFuture<'static, R>;

/// Boxed, type-erased task.
pub type BoxTask<R> = Box<dyn Task<R>>;

/// # Deferred, one-shot asynchronous unit.
///
/// # Example
/// ```
/// use eventkit::{BoxTaskFuture, Task};
///
/// struct Fetch(&'static str);
///
/// impl Task<usize> for Fetch {
///     fn name(&self) -> &str { "fetch" }
///
///     fn spawn(self: Box<Self>) -> BoxTaskFuture<usize> {
///         Box::pin(async move { self.0.len() })
///     }
/// }
/// ```
pub trait Task<R>: Send + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Creates the future. Called exactly once, when the task reaches the head of the queue.
    fn spawn(self: Box<Self>) -> BoxTaskFuture<R>;
}

/// Function-backed task: a named closure that creates the future on demand.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: &'static str,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a named function-backed task.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F, Fut, R> Task<R> for TaskFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn spawn(self: Box<Self>) -> BoxTaskFuture<R> {
        Box::pin((self.f)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_factory_runs_only_on_spawn() {
        let called = Arc::new(AtomicBool::new(false));
        let c = called.clone();
        let task: BoxTask<u8> = Box::new(TaskFn::new("probe", move || {
            c.store(true, Ordering::SeqCst);
            async { 42 }
        }));

        assert_eq!(task.name(), "probe");
        assert!(!called.load(Ordering::SeqCst));

        let fut = task.spawn();
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(fut.await, 42);
    }
}
