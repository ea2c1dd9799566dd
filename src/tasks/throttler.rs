//! # Serializing task queue.
//!
//! [`Throttler`] accepts tasks and guarantees that exactly one is in flight at a
//! time. Each caller gets a [`Ticket`] that resolves with *its own* task's result,
//! correlated through a private completion [`Emitter`].
//!
//! ## Architecture
//! ```text
//! queue(task)
//!   ├─► token = Uuid::new_v4()
//!   ├─► completion.subscribe(|c| c.token == token → send result, unsubscribe self)
//!   ├─► pending.push_back((token, task))
//!   └─► claim(): if active.is_none() → pop head, active = token, spawn run loop
//!
//! run loop (one tokio task while work remains):
//!   loop {
//!     result = catch_unwind(task.spawn().await)   (panic → no result)
//!     active = None
//!     completion.fire(Completion{token, result})
//!     next = claim() else break
//!   }
//! ```
//!
//! ## Rules
//! - `active` is `Some` iff a task is executing; only `claim` sets it.
//! - Tasks start strictly in FIFO order of `queue` calls.
//! - A correlation listener disposes itself as soon as its token is announced.
//! - A task that panics while creating or polling its future resolves its ticket
//!   with [`ThrottlerError::Abandoned`]; the queue keeps going.
//! - Disposal lets the in-flight task finish, drops pending tasks and resolves
//!   every outstanding ticket with [`ThrottlerError::Disposed`].
//! - `queue` must be called from within a Tokio runtime.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{LifecycleError, ThrottlerError};
use crate::events::Emitter;
use crate::lifecycle::{Disposable, DisposableStore, DisposeCell, Ownable};
use crate::tasks::task::{BoxTask, Task, TaskFn};

/// Completion announcement for one correlation token.
struct Completion<R> {
    token: Uuid,
    /// `None` when the task panicked. Taken by the matching listener.
    result: Mutex<Option<R>>,
}

struct Pending<R> {
    token: Uuid,
    task: BoxTask<R>,
}

struct State<R> {
    pending: VecDeque<Pending<R>>,
    active: Option<Uuid>,
}

struct Inner<R> {
    state: Mutex<State<R>>,
    completion: Arc<Emitter<Completion<R>>>,
    store: DisposableStore,
    cancel: CancellationToken,
}

impl<R: Send + 'static> Inner<R> {
    /// Moves the head of the queue into the active slot, if the slot is free.
    fn claim(&self) -> Option<Pending<R>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut state = self.state.lock();
        if state.active.is_some() {
            return None;
        }
        let job = state.pending.pop_front()?;
        state.active = Some(job.token);
        Some(job)
    }

    /// Clears the active slot and announces the outcome.
    fn complete(&self, token: Uuid, result: Option<R>) {
        self.state.lock().active = None;

        let announced = self.completion.fire(Completion {
            token,
            result: Mutex::new(result),
        });
        if let Err(e) = announced {
            tracing::warn!(%token, error = %e, "completion listener failed");
        }
    }

    async fn drive(self: Arc<Self>, mut job: Pending<R>) {
        loop {
            let Pending { token, task } = job;
            tracing::debug!(%token, task = task.name(), "throttled task started");

            // `spawn` runs the factory, so it must be inside the unwind guard too.
            let outcome = AssertUnwindSafe(async move { task.spawn().await })
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(value) => Some(value),
                Err(panic_err) => {
                    let info = panic_message(&*panic_err);
                    tracing::warn!(%token, info = %info, "throttled task panicked");
                    None
                }
            };

            self.complete(token, result);

            match self.claim() {
                Some(next) => job = next,
                None => break,
            }
        }
        tracing::debug!("throttler run loop idle");
    }
}

/// Serializing task queue.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use eventkit::Throttler;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let throttler = Throttler::new();
///
///     let slow = throttler.queue(|| async {
///         tokio::time::sleep(Duration::from_millis(10)).await;
///         "a"
///     });
///     let fast = throttler.queue(|| async { "b" });
///
///     assert_eq!(slow.await.unwrap(), "a");
///     assert_eq!(fast.await.unwrap(), "b");
/// }
/// ```
pub struct Throttler<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Throttler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Send + 'static> Throttler<R> {
    /// Creates an idle throttler.
    pub fn new() -> Self {
        let completion = Arc::new(Emitter::new());
        let store = DisposableStore::new();
        store.insert(completion.clone());

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    pending: VecDeque::new(),
                    active: None,
                }),
                completion,
                store,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Queues a task factory; it runs after every previously queued task.
    pub fn queue<F, Fut>(&self, factory: F) -> Ticket<R>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.queue_task(TaskFn::new("anonymous", factory))
    }

    /// Queues a [`Task`]; it runs after every previously queued task.
    pub fn queue_task(&self, task: impl Task<R>) -> Ticket<R> {
        let (tx, rx) = oneshot::channel();
        let ticket = Ticket {
            rx,
            cancel: self.inner.cancel.clone(),
        };
        if self.inner.cancel.is_cancelled() {
            return ticket;
        }

        let token = Uuid::new_v4();
        let tx = Mutex::new(Some(tx));
        let unsubscribe = Arc::new(DisposeCell::new());
        let detach = unsubscribe.clone();

        let sub = self.inner.completion.subscribe(move |c: &Completion<R>| {
            if c.token != token {
                return;
            }
            let sender = tx.lock().take();
            let result = c.result.lock().take();
            if let (Some(sender), Some(result)) = (sender, result) {
                let _ = sender.send(result);
            }
            detach.fire();
        });
        unsubscribe.arm(move || sub.dispose());

        self.inner.state.lock().pending.push_back(Pending {
            token,
            task: Box::new(task),
        });

        if let Some(job) = self.inner.claim() {
            tokio::spawn(self.inner.clone().drive(job));
        }
        ticket
    }

    /// Returns true if nothing is running or waiting.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.active.is_none() && state.pending.is_empty()
    }

    /// Number of tasks waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }
}

impl<R: Send + 'static> Default for Throttler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + 'static> Ownable for Throttler<R> {
    fn store(&self) -> &DisposableStore {
        &self.inner.store
    }
}

impl<R: Send + 'static> Disposable for Throttler<R> {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.inner.cancel.cancel();
        let dropped = std::mem::take(&mut self.inner.state.lock().pending);
        drop(dropped);
        self.dispose_owned()
    }
}

impl<R: Send + 'static> fmt::Debug for Throttler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Throttler")
            .field("active", &state.active)
            .field("pending", &state.pending.len())
            .field("disposed", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

/// Future resolving with the result of one queued task.
#[must_use = "a ticket does nothing unless awaited"]
pub struct Ticket<R> {
    rx: oneshot::Receiver<R>,
    cancel: CancellationToken,
}

impl<R> Future for Ticket<R> {
    type Output = Result<R, ThrottlerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(_)) if self.cancel.is_cancelled() => {
                Poll::Ready(Err(ThrottlerError::Disposed))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(ThrottlerError::Abandoned)),
        }
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    #[tokio::test(start_paused = true)]
    async fn test_second_task_waits_for_first() {
        let throttler = Throttler::new();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let first = throttler.queue(move || async move {
            l1.lock().push("f1-start");
            tokio::time::sleep(Duration::from_millis(10)).await;
            l1.lock().push("f1-end");
            "a"
        });
        let l2 = log.clone();
        let second = throttler.queue(move || {
            l2.lock().push("f2-factory");
            async { "b" }
        });
        assert_eq!(throttler.pending(), 1);

        assert_eq!(second.await.unwrap(), "b");
        assert_eq!(first.await.unwrap(), "a");
        assert_eq!(*log.lock(), vec!["f1-start", "f1-end", "f2-factory"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_are_correlated_to_callers() {
        let throttler = Throttler::new();
        let tickets: Vec<_> = (0..5u64)
            .map(|i| {
                throttler.queue(move || async move {
                    tokio::time::sleep(Duration::from_millis(5 - i)).await;
                    i * 10
                })
            })
            .collect();

        for (i, ticket) in tickets.into_iter().enumerate() {
            assert_eq!(ticket.await.unwrap(), i as u64 * 10);
        }
    }

    #[tokio::test]
    async fn test_correlation_listeners_are_removed() {
        let throttler = Throttler::new();
        for i in 0..10u32 {
            assert_eq!(throttler.queue(move || async move { i }).await.unwrap(), i);
        }
        assert_eq!(throttler.inner.completion.listener_count(), 0);
        assert!(throttler.is_idle());
    }

    #[tokio::test]
    async fn test_panicking_task_is_abandoned_and_queue_continues() {
        let throttler: Throttler<u32> = Throttler::new();
        let bad = throttler.queue(|| async {
            let fail = true;
            if fail {
                panic!("task exploded");
            }
            0
        });
        let good = throttler.queue(|| async { 7 });

        assert_eq!(bad.await.unwrap_err(), ThrottlerError::Abandoned);
        assert_eq!(good.await.unwrap(), 7);
        assert_eq!(throttler.inner.completion.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_factory_is_abandoned_and_queue_continues() {
        let throttler: Throttler<u32> = Throttler::new();
        let bad = throttler.queue(|| -> std::future::Ready<u32> { panic!("factory exploded") });
        let good = throttler.queue(|| async { 7 });

        assert_eq!(bad.await.unwrap_err(), ThrottlerError::Abandoned);
        assert_eq!(good.await.unwrap(), 7);
        assert_eq!(throttler.inner.completion.listener_count(), 0);
        assert!(throttler.is_idle());
    }

    #[tokio::test]
    async fn test_panicking_task_spawn_is_abandoned() {
        struct Broken;

        impl Task<u32> for Broken {
            fn spawn(self: Box<Self>) -> crate::tasks::BoxTaskFuture<u32> {
                panic!("spawn exploded")
            }
        }

        let throttler = Throttler::new();
        let bad = throttler.queue_task(Broken);
        let good = throttler.queue(|| async { 1 });

        assert_eq!(bad.await.unwrap_err(), ThrottlerError::Abandoned);
        assert_eq!(good.await.unwrap(), 1);
        assert_eq!(throttler.inner.completion.listener_count(), 0);
        assert!(throttler.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_resolves_outstanding_tickets() {
        let throttler = Throttler::new();
        let running = throttler.queue(|| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            1
        });
        let waiting = throttler.queue(|| async { 2 });

        throttler.dispose().unwrap();
        assert!(Ownable::is_disposed(&throttler));
        assert_eq!(throttler.pending(), 0);

        assert_eq!(waiting.await.unwrap_err(), ThrottlerError::Disposed);
        assert_eq!(running.await.unwrap_err(), ThrottlerError::Disposed);

        let late = throttler.queue(|| async { 3 });
        assert_eq!(late.await.unwrap_err(), ThrottlerError::Disposed);
    }

    #[tokio::test]
    async fn test_queue_task_uses_named_task() {
        struct Double(u32);

        impl Task<u32> for Double {
            fn name(&self) -> &str {
                "double"
            }

            fn spawn(self: Box<Self>) -> crate::tasks::BoxTaskFuture<u32> {
                Box::pin(async move { self.0 * 2 })
            }
        }

        let throttler = Throttler::new();
        assert_eq!(throttler.queue_task(Double(21)).await.unwrap(), 42);
    }
}
