//! # eventkit
//!
//! **eventkit** is a small in-process toolkit for notification and resource
//! lifecycle management.
//!
//! It provides an event emitter with reentrant-safe delivery and listener leak
//! detection, a disposable ownership graph for deterministic teardown, and a
//! throttler that serializes asynchronous work using an emitter as its
//! completion channel.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────────────────────────────────────────────────────────┐
//!  │ Component (Ownable)                                              │
//!  │   └─ DisposableStore ──────────────┬───────────────┐             │
//!  └────────────────────────────────────┼───────────────┼─────────────┘
//!                                       ▼               ▼
//!                          ┌─────────────────┐   ┌──────────────────────┐
//!                          │   Emitter<T>    │   │     Throttler<R>     │
//!                          │ - listeners     │   │ - pending (FIFO)     │
//!                          │   (LinkedList)  │   │ - active slot        │
//!                          │ - delivery queue│◄──┤ - completion Emitter │
//!                          │ - LeakMonitor   │   └──────────┬───────────┘
//!                          └───────┬─────────┘              │
//!                                  │ Subscription           │ Ticket<R>
//!                                  ▼ (DisposeCell)          ▼
//!                              listeners                 callers
//! ```
//!
//! ### Delivery
//! ```text
//! fire(v)
//!   ├─► snapshot listeners → push (listener, v) onto the shared delivery queue
//!   └─► drain FIFO until empty
//!         ├─ nested fire(w) from a callback appends to the same queue
//!         └─ first listener error aborts the pass → Err(EmitterError::Delivery)
//! ```
//!
//! ### Throttling
//! ```text
//! queue(f1) ──► [f1] ──► run f1 ──► announce(token1, r1) ──► Ticket#1 = r1
//! queue(f2) ──► [f2] ─────────────────────────────────────► run f2 ──► Ticket#2 = r2
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types                                   |
//! |-----------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Events**      | Typed pub/sub with hooks, leak detection and profiling.      | [`Emitter`], [`Event`], [`EmitterOptions`]  |
//! | **Lifecycle**   | Idempotent teardown, ownership trees, aggregated failures.   | [`Disposable`], [`DisposableStore`], [`Ownable`] |
//! | **Handles**     | One-shot disposal cells and subscription handles.            | [`DisposeCell`], [`Subscription`]           |
//! | **Throttling**  | One-at-a-time FIFO execution of async tasks.                 | [`Throttler`], [`Ticket`], [`Task`]         |
//! | **Collections** | Ordered list with O(1) removal by handle.                    | [`LinkedList`], [`NodeHandle`]              |
//! | **Errors**      | Typed errors for disposal, delivery and throttling.          | [`LifecycleError`], [`EmitterError`], [`ThrottlerError`] |
//!
//! ## Logging
//! The crate emits [`tracing`] events (leak warnings, late registrations,
//! fire profiling) and never installs a subscriber itself.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use eventkit::{Disposable, DisposableStore, Emitter, Throttler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DisposableStore::new();
//!     let saved = store.add(Arc::new(Emitter::<String>::new()))?;
//!
//!     let log = Arc::new(Mutex::new(Vec::new()));
//!     let l = log.clone();
//!     saved.event().subscribe_into(move |name: &String| l.lock().push(name.clone()), &store);
//!
//!     let throttler = Throttler::new();
//!     let s = saved.clone();
//!     let name = throttler
//!         .queue(move || async move {
//!             s.fire("notes.md".to_string()).ok();
//!             "notes.md"
//!         })
//!         .await?;
//!
//!     assert_eq!(name, "notes.md");
//!     assert_eq!(*log.lock(), vec!["notes.md".to_string()]);
//!
//!     throttler.dispose()?;
//!     store.dispose()?;
//!     assert!(saved.is_disposed());
//!     Ok(())
//! }
//! ```
mod collections;
mod error;
mod events;
mod lifecycle;
mod tasks;

// ---- Public re-exports ----

pub use collections::{Iter, LinkedList, NodeHandle};
pub use error::{BoxError, EmitterError, LifecycleError, ThrottlerError};
pub use events::{
    CallSite, Emitter, EmitterOptions, Event, Hook, LeakMonitor, Subscription, ThresholdGuard,
    global_leak_warning_threshold, set_global_leak_warning_threshold,
};
pub use lifecycle::{Disposable, DisposableStore, DisposeCell, Ownable, to_disposable};
pub use tasks::{BoxTask, BoxTaskFuture, Task, TaskFn, Throttler, Ticket};
