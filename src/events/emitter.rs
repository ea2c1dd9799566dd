//! # Event source with reentrant, fail-loud delivery.
//!
//! [`Emitter`] owns a listener set and a delivery queue. [`Event`] is the
//! cloneable subscribe-only capability handed to consumers.
//!
//! ## Architecture
//! ```text
//! subscribe(cb) ──► listeners: LinkedList<Listener> ──► Subscription (DisposeCell: "remove me")
//!
//! fire(v)
//!   ├─► for each listener: delivery.push((listener, v))   (snapshot)
//!   └─► drain: while let Some((l, v)) = delivery.shift() { l.callback(&v)? }
//!                      ▲
//!                      └── a nested fire() pushes onto the SAME queue
//! ```
//!
//! ## Rules
//! - **Snapshot**: each `fire` enqueues the listeners registered when it starts;
//!   listeners added during delivery only see later fires.
//! - **Shared queue**: nested fires interleave into one flat FIFO order and
//!   everything is delivered before the outermost `fire` returns.
//! - **No retroactive filter**: disposing a subscription does not cancel pairs
//!   already queued for the current drain.
//! - **Fail loud**: the first listener error aborts the drain and is returned as
//!   [`EmitterError::Delivery`]; the remaining pairs stay queued and are delivered
//!   by the next drain. Panics unwind through `fire` the same way.
//! - **Reentrancy**: no lock is held while user code (callbacks, hooks) runs.
//! - **Concurrent subscribe**: the first-listener hooks run once per empty → non-empty
//!   transition. A subscriber racing with that transition may be recorded while
//!   `on_first_listener_add` is still running on the other thread.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::collections::{LinkedList, NodeHandle};
use crate::error::{BoxError, EmitterError, LifecycleError};
use crate::events::leak::{CallSite, LeakMonitor};
use crate::events::options::EmitterOptions;
use crate::events::profiling::EventProfiling;
use crate::lifecycle::{Disposable, DisposableStore, DisposeCell};

/// Used to label emitters that have no diagnostics name.
static EMITTER_SEQ: AtomicU64 = AtomicU64::new(0);

type Callback<T> = dyn Fn(&T) -> Result<(), BoxError> + Send + Sync;

/// One registered listener.
struct Listener<T> {
    callback: Box<Callback<T>>,
    site: CallSite,
    remover: Arc<DisposeCell>,
}

type Delivery<T> = (Arc<Listener<T>>, Arc<T>);

struct State<T> {
    listeners: Option<LinkedList<Arc<Listener<T>>>>,
    delivery: Option<LinkedList<Delivery<T>>>,
    /// Set while a first subscriber runs `on_first_listener_add` and has not been recorded yet.
    first_pending: bool,
    disposed: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    options: EmitterOptions,
    leak: LeakMonitor,
    profiling: Option<EventProfiling>,
}

impl<T: Send + Sync + 'static> Inner<T> {
    fn subscribe(self: &Arc<Self>, callback: Box<Callback<T>>, site: CallSite) -> Subscription {
        // Claiming `first_pending` under the same guard as the emptiness check keeps
        // concurrent subscribers from running the first-listener hooks twice.
        let first = {
            let mut state = self.state.lock();
            if state.disposed {
                drop(state);
                tracing::debug!(site = %site, "subscribe on disposed emitter ignored");
                return Subscription::none();
            }
            let first = !state.first_pending
                && state.listeners.as_ref().is_none_or(LinkedList::is_empty);
            state.first_pending |= first;
            first
        };

        if first {
            if let Some(hook) = &self.options.on_first_listener_add {
                hook();
            }
        }

        let remover = Arc::new(DisposeCell::new());
        let listener = Arc::new(Listener {
            callback,
            site,
            remover: remover.clone(),
        });

        let (handle, count) = {
            let mut state = self.state.lock();
            if first {
                state.first_pending = false;
            }
            if state.disposed {
                return Subscription::none();
            }
            let listeners = state.listeners.get_or_insert_with(LinkedList::new);
            let handle = listeners.push(listener);
            (handle, listeners.len())
        };

        let sampled = self.leak.check(site, count);
        let weak = Arc::downgrade(self);
        remover.arm(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(handle, site, sampled);
            }
        });

        if first {
            if let Some(hook) = &self.options.on_first_listener_did_add {
                hook();
            }
        }
        if let Some(hook) = &self.options.on_listener_did_add {
            hook();
        }

        Subscription { cell: remover }
    }

    fn remove(&self, handle: NodeHandle, site: CallSite, sampled: bool) {
        let (removed, now_empty) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            let Some(listeners) = state.listeners.as_mut() else {
                return;
            };
            let removed = listeners.remove(handle);
            (removed, listeners.is_empty())
        };

        if removed.is_none() {
            return;
        }
        drop(removed);

        if sampled {
            self.leak.release(site);
        }
        if now_empty {
            if let Some(hook) = &self.options.on_last_listener_remove {
                hook();
            }
        }
    }

    fn fire(&self, event: T) -> Result<(), EmitterError> {
        let event = Arc::new(event);
        let listener_count = {
            let mut state = self.state.lock();
            let State {
                listeners,
                delivery,
                ..
            } = &mut *state;

            let Some(listeners) = listeners.as_ref().filter(|l| !l.is_empty()) else {
                return Ok(());
            };
            let queue = delivery.get_or_insert_with(LinkedList::new);
            for listener in listeners {
                queue.push((listener.clone(), event.clone()));
            }
            listeners.len()
        };

        let started = self.profiling.as_ref().map(EventProfiling::start);
        let result = self.drain();
        if let (Some(profiling), Some(started)) = (&self.profiling, started) {
            profiling.stop(started, listener_count);
        }
        result
    }

    /// Delivers queued pairs until the shared queue is empty or a listener fails.
    fn drain(&self) -> Result<(), EmitterError> {
        loop {
            let next = self.state.lock().delivery.as_mut().and_then(LinkedList::shift);
            let Some((listener, event)) = next else {
                return Ok(());
            };
            (listener.callback)(&*event).map_err(|source| EmitterError::Delivery { source })?;
        }
    }

    fn dispose(&self) {
        let (listeners, delivery) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (state.listeners.take(), state.delivery.take())
        };

        // Outstanding subscriptions must not run removal logic against a torn-down emitter.
        for listener in listeners.iter().flatten() {
            listener.remover.disarm();
        }
        drop(delivery);
        drop(listeners);

        self.leak.reset();
        if let Some(hook) = &self.options.on_last_listener_remove {
            hook();
        }
    }
}

/// Publish/subscribe event source.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use eventkit::{Disposable, Emitter};
///
/// let emitter = Emitter::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let s = seen.clone();
/// let sub = emitter.subscribe(move |v: &u32| s.lock().push(*v));
///
/// emitter.fire(1).unwrap();
/// sub.dispose();
/// emitter.fire(2).unwrap();
///
/// assert_eq!(*seen.lock(), vec![1]);
/// emitter.dispose().unwrap();
/// ```
pub struct Emitter<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> Emitter<T> {
    /// Creates an emitter with default options.
    pub fn new() -> Self {
        Self::with_options(EmitterOptions::default())
    }

    /// Creates an emitter with the given hooks and diagnostics settings.
    pub fn with_options(options: EmitterOptions) -> Self {
        let id = EMITTER_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = options
            .diagnostics_name
            .clone()
            .unwrap_or_else(|| format!("emitter#{id}"));
        let leak = LeakMonitor::new(name, options.leak_warning_threshold);
        let profiling = options.diagnostics_name.as_deref().map(EventProfiling::new);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    listeners: None,
                    delivery: None,
                    first_pending: false,
                    disposed: false,
                }),
                options,
                leak,
                profiling,
            }),
        }
    }

    /// Returns the subscribe-only capability for this emitter.
    pub fn event(&self) -> Event<T> {
        Event {
            inner: self.inner.clone(),
        }
    }

    /// Shorthand for `self.event().subscribe(callback)`.
    #[track_caller]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let site = Location::caller();
        self.inner.subscribe(into_callback(callback), site)
    }

    /// Shorthand for `self.event().try_subscribe(callback)`.
    #[track_caller]
    pub fn try_subscribe<E>(
        &self,
        callback: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static,
    ) -> Subscription
    where
        E: Into<BoxError>,
    {
        let site = Location::caller();
        self.inner.subscribe(into_fallible(callback), site)
    }

    /// Delivers `event` to every current listener.
    ///
    /// No-op when there are no listeners or the emitter is disposed.
    pub fn fire(&self, event: T) -> Result<(), EmitterError> {
        self.inner.fire(event)
    }

    /// Returns true if at least one listener is registered.
    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .listeners
            .as_ref()
            .map_or(0, LinkedList::len)
    }

    /// Returns true once the emitter has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Number of leak warnings this emitter has logged.
    pub fn leak_warnings(&self) -> usize {
        self.inner.leak.warning_count()
    }
}

impl<T: Send + Sync + 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Disposable for Emitter<T> {
    /// Drops all listeners and queued deliveries, then runs `on_last_listener_remove` once.
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.inner.dispose();
        Ok(())
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Subscribe-only view of an [`Emitter`].
///
/// Cheap to clone; hand it to consumers that should listen but never fire.
pub struct Event<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Event<T> {
    /// Registers an infallible listener.
    #[track_caller]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let site = Location::caller();
        self.inner.subscribe(into_callback(callback), site)
    }

    /// Registers a listener whose error aborts the current delivery pass.
    #[track_caller]
    pub fn try_subscribe<E>(
        &self,
        callback: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static,
    ) -> Subscription
    where
        E: Into<BoxError>,
    {
        let site = Location::caller();
        self.inner.subscribe(into_fallible(callback), site)
    }

    /// Registers `method` bound to `receiver`.
    #[track_caller]
    pub fn subscribe_bound<R>(&self, receiver: Arc<R>, method: fn(&R, &T)) -> Subscription
    where
        R: Send + Sync + 'static,
    {
        let site = Location::caller();
        self.inner
            .subscribe(into_callback(move |e: &T| method(&receiver, e)), site)
    }

    /// Registers a listener and adds its subscription to `store`.
    #[track_caller]
    pub fn subscribe_into(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        store: &DisposableStore,
    ) -> Arc<Subscription> {
        let site = Location::caller();
        let sub = Arc::new(self.inner.subscribe(into_callback(callback), site));
        store.insert(sub.clone());
        sub
    }
}

fn into_callback<T>(callback: impl Fn(&T) + Send + Sync + 'static) -> Box<Callback<T>> {
    Box::new(move |e: &T| {
        callback(e);
        Ok(())
    })
}

fn into_fallible<T, E: Into<BoxError>>(
    callback: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static,
) -> Box<Callback<T>> {
    Box::new(move |e: &T| callback(e).map_err(Into::into))
}

/// Disposal handle for one listener.
///
/// Disposing removes the listener; later calls are no-ops. Dropping the handle
/// does **not** unsubscribe.
#[must_use = "dropping a subscription keeps the listener registered; dispose it to unsubscribe"]
pub struct Subscription {
    cell: Arc<DisposeCell>,
}

impl Subscription {
    /// A handle that is not attached to any listener.
    pub fn none() -> Self {
        Self {
            cell: Arc::new(DisposeCell::new()),
        }
    }

    /// Removes the listener. Idempotent.
    pub fn dispose(&self) {
        self.cell.fire();
    }

    /// Returns true while disposing would still remove a listener.
    pub fn is_active(&self) -> bool {
        self.cell.is_armed()
    }
}

impl Disposable for Subscription {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.cell.fire();
        Ok(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
