//! Resource lifecycle: the disposable ownership graph.
//!
//! ## Contents
//! - [`Disposable`] idempotent teardown contract, [`to_disposable`] closure adapter
//! - [`DisposeCell`] one-shot callback cell (basis of subscription handles)
//! - [`DisposableStore`] owned set with cascading, failure-aggregating disposal
//! - [`Ownable`] base capability for components with a private store
//!
//! ## Ownership graph
//! ```text
//! Component (Ownable)
//!   └─ DisposableStore
//!        ├─ Emitter ──► listeners (Subscription = DisposeCell)
//!        ├─ Throttler
//!        └─ Child component (Ownable) ─► its own store ─► ...
//! ```
//! One `dispose` on the root tears down the whole tree.

pub(crate) mod cell;
pub(crate) mod disposable;
mod ownable;
mod store;

pub use cell::DisposeCell;
pub use disposable::{Disposable, to_disposable};
pub use ownable::Ownable;
pub use store::DisposableStore;
