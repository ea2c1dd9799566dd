//! # Core disposal contract.
//!
//! [`Disposable`] is implemented by everything that owns a teardown action:
//! subscriptions, emitters, stores, throttlers. Owners keep resources as
//! `Arc<dyn Disposable>` and call [`Disposable::dispose`] exactly when their own
//! lifetime ends.
//!
//! ## Contract
//! - `dispose` must be idempotent: the second call is a no-op returning `Ok(())`.
//! - A failure is reported, never swallowed; owners aggregate failures from a sweep.

use std::sync::Arc;

use crate::error::LifecycleError;
use crate::lifecycle::cell::DisposeCell;

/// A resource with an explicit, idempotent teardown.
///
/// # Example
/// ```
/// use eventkit::{Disposable, LifecycleError};
///
/// struct Connection;
///
/// impl Disposable for Connection {
///     fn dispose(&self) -> Result<(), LifecycleError> {
///         // close sockets...
///         Ok(())
///     }
/// }
///
/// assert!(Connection.dispose().is_ok());
/// ```
pub trait Disposable: Send + Sync {
    /// Releases the resource. Calling it again has no further effect.
    fn dispose(&self) -> Result<(), LifecycleError>;
}

/// Wraps a closure as a one-shot disposable.
///
/// The closure runs on the first `dispose` and never again.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use eventkit::{Disposable, to_disposable};
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = hits.clone();
/// let d = to_disposable(move || { h.fetch_add(1, Ordering::SeqCst); });
///
/// d.dispose().unwrap();
/// d.dispose().unwrap();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub fn to_disposable(f: impl FnOnce() + Send + 'static) -> Arc<DisposeCell> {
    Arc::new(DisposeCell::armed(f))
}

/// Identity of the allocation behind an `Arc`, with any vtable stripped.
#[inline]
pub(crate) fn identity<D: ?Sized>(resource: &Arc<D>) -> *const () {
    Arc::as_ptr(resource) as *const ()
}
