//! # Ownership store with cascading disposal.
//!
//! [`DisposableStore`] owns a set of [`Disposable`] resources and disposes all of
//! them when it is itself disposed.
//!
//! ## Architecture
//! ```text
//! component.dispose()
//!     └─► store.dispose()
//!           ├─► child_1.dispose()   ── Ok
//!           ├─► child_2.dispose()   ── Err(e2) ┐
//!           └─► child_N.dispose()   ── Err(eN) ┴─► Aggregate([e2, eN])
//! ```
//!
//! ## Rules
//! - **Set semantics**: registering the same `Arc` twice stores it once. Lookups
//!   go through an address index, so `add` and `delete` are O(1).
//! - **No self-ownership**: `add(self)` fails before any mutation.
//! - **Dispose once**: the first `dispose` sweeps; later calls are no-ops.
//! - **Failures**: one failure is returned unchanged, more become `Aggregate`.
//! - **Late add**: adding after `dispose` still registers and logs a leak warning;
//!   the resource will never be disposed by this store.
//! - The internal lock is released before any owned resource runs its teardown.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collections::{LinkedList, NodeHandle};
use crate::error::LifecycleError;
use crate::lifecycle::Disposable;
use crate::lifecycle::disposable::identity;

#[derive(Default)]
struct StoreState {
    /// Registration order.
    owned: LinkedList<Arc<dyn Disposable>>,
    /// Resource address → its node in `owned`.
    index: HashMap<usize, NodeHandle>,
    disposed: bool,
}

impl StoreState {
    /// Empties the store, returning resources in registration order.
    fn take_owned(&mut self) -> Vec<Arc<dyn Disposable>> {
        self.index.clear();
        let mut owned = std::mem::take(&mut self.owned);
        std::iter::from_fn(|| owned.shift()).collect()
    }
}

fn key<D: ?Sized>(resource: &Arc<D>) -> usize {
    identity(resource) as usize
}

/// Collection of owned disposables.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use eventkit::{Disposable, DisposableStore, to_disposable};
///
/// let store = DisposableStore::new();
/// let child = store.add(to_disposable(|| println!("bye"))).unwrap();
/// assert!(child.is_armed());
///
/// store.dispose().unwrap();
/// assert!(!child.is_armed());
/// assert!(store.is_disposed());
/// ```
#[derive(Default)]
pub struct DisposableStore {
    state: Mutex<StoreState>,
}

impl DisposableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resource` and hands it back.
    ///
    /// Returns [`LifecycleError::SelfRegistration`] if `resource` is this store.
    pub fn add<D: Disposable + 'static>(&self, resource: Arc<D>) -> Result<Arc<D>, LifecycleError> {
        self.add_dyn(resource.clone())?;
        Ok(resource)
    }

    /// Registers an already type-erased resource.
    pub fn add_dyn(&self, resource: Arc<dyn Disposable>) -> Result<(), LifecycleError> {
        if std::ptr::eq(identity(&resource), self as *const Self as *const ()) {
            return Err(LifecycleError::SelfRegistration);
        }
        self.insert(resource);
        Ok(())
    }

    /// Registers a resource known not to be this store.
    pub(crate) fn insert(&self, resource: Arc<dyn Disposable>) {
        let leaked = {
            let mut state = self.state.lock();
            let addr = key(&resource);
            if state.index.contains_key(&addr) {
                return;
            }
            let handle = state.owned.push(resource);
            state.index.insert(addr, handle);
            state.disposed
        };

        if leaked {
            tracing::warn!(
                "adding a disposable to a store that has already been disposed; the added object will be leaked"
            );
        }
    }

    /// Removes `resource` from the store and disposes it.
    ///
    /// Does nothing if the resource is not owned by this store.
    pub fn delete<D: Disposable + ?Sized>(&self, resource: &Arc<D>) -> Result<(), LifecycleError> {
        let removed = {
            let mut state = self.state.lock();
            match state.index.remove(&key(resource)) {
                Some(handle) => state.owned.remove(handle),
                None => None,
            }
        };

        match removed {
            Some(r) => r.dispose(),
            None => Ok(()),
        }
    }

    /// Disposes every owned resource without marking the store disposed.
    pub fn clear(&self) -> Result<(), LifecycleError> {
        let owned = self.state.lock().take_owned();
        sweep(owned)
    }

    /// Returns true once [`dispose`](Disposable::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Number of resources currently owned.
    pub fn len(&self) -> usize {
        self.state.lock().owned.len()
    }

    /// Returns true if nothing is owned.
    pub fn is_empty(&self) -> bool {
        self.state.lock().owned.is_empty()
    }
}

impl Disposable for DisposableStore {
    fn dispose(&self) -> Result<(), LifecycleError> {
        let owned = {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.take_owned()
        };
        sweep(owned)
    }
}

impl fmt::Debug for DisposableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DisposableStore")
            .field("owned", &state.owned.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Disposes every resource, in registration order, collecting failures.
fn sweep(owned: Vec<Arc<dyn Disposable>>) -> Result<(), LifecycleError> {
    let errors: Vec<LifecycleError> = owned.iter().filter_map(|r| r.dispose().err()).collect();
    LifecycleError::from_sweep(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::to_disposable;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Resource that counts disposals and optionally fails.
    struct Probe {
        hits: AtomicUsize,
        fail_with: Option<&'static str>,
    }

    impl Probe {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                hits: AtomicUsize::new(0),
                fail_with: None,
            })
        }

        fn failing(msg: &'static str) -> Arc<Self> {
            Arc::new(Self {
                hits: AtomicUsize::new(0),
                fail_with: Some(msg),
            })
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    impl Disposable for Probe {
        fn dispose(&self) -> Result<(), LifecycleError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(msg) => Err(LifecycleError::failed(msg)),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_dispose_disposes_all_once() {
        let store = DisposableStore::new();
        let a = store.add(Probe::ok()).unwrap();
        let b = store.add(Probe::ok()).unwrap();

        store.dispose().unwrap();
        store.dispose().unwrap();

        assert_eq!(a.hits(), 1);
        assert_eq!(b.hits(), 1);
        assert!(store.is_disposed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_stored_once() {
        let store = DisposableStore::new();
        let a = Probe::ok();
        store.add(a.clone()).unwrap();
        store.add(a.clone()).unwrap();
        assert_eq!(store.len(), 1);

        store.dispose().unwrap();
        assert_eq!(a.hits(), 1);
    }

    #[test]
    fn test_self_registration_fails_fast() {
        let store = Arc::new(DisposableStore::new());
        let err = store.add(store.clone()).unwrap_err();

        assert!(matches!(err, LifecycleError::SelfRegistration));
        assert!(store.is_empty());
    }

    #[test]
    fn test_single_failure_is_propagated_unchanged() {
        let store = DisposableStore::new();
        let r1 = store.add(Probe::failing("r1 broke")).unwrap();
        let r2 = store.add(Probe::ok()).unwrap();

        let err = store.dispose().unwrap_err();
        assert!(matches!(err, LifecycleError::Failed { .. }));
        assert!(err.to_string().contains("r1 broke"));
        assert_eq!(r1.hits(), 1);
        assert_eq!(r2.hits(), 1);
    }

    #[test]
    fn test_multiple_failures_are_aggregated() {
        let store = DisposableStore::new();
        store.add(Probe::failing("r1 broke")).unwrap();
        store.add(Probe::failing("r2 broke")).unwrap();

        let err = store.dispose().unwrap_err();
        match &err {
            LifecycleError::Aggregate(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].to_string().contains("r1 broke"));
                assert!(errors[1].to_string().contains("r2 broke"));
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_clear_keeps_store_usable() {
        let store = DisposableStore::new();
        let a = store.add(Probe::ok()).unwrap();

        store.clear().unwrap();
        assert_eq!(a.hits(), 1);
        assert!(!store.is_disposed());

        let b = store.add(Probe::ok()).unwrap();
        store.dispose().unwrap();
        assert_eq!(b.hits(), 1);
        assert_eq!(a.hits(), 1);
    }

    /// Counts WARN events seen while installed as the default subscriber.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_add_after_dispose_registers_but_never_disposes() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        let (store, late) = tracing::subscriber::with_default(subscriber, || {
            let store = DisposableStore::new();
            store.dispose().unwrap();
            assert_eq!(warnings.load(Ordering::SeqCst), 0);

            let late = store.add(Probe::ok()).unwrap();
            store.add(late.clone()).unwrap();
            (store, late)
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);

        store.dispose().unwrap();
        assert_eq!(late.hits(), 0);
    }

    #[test]
    fn test_delete_keeps_registration_order() {
        let store = DisposableStore::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let cells: Vec<_> = (0..5)
            .map(|i| {
                let o = order.clone();
                store.add(to_disposable(move || o.lock().push(i))).unwrap()
            })
            .collect();

        store.delete(&cells[1]).unwrap();
        store.delete(&cells[3]).unwrap();
        assert_eq!(store.len(), 3);

        store.add(cells[0].clone()).unwrap();
        assert_eq!(store.len(), 3);

        store.dispose().unwrap();
        assert_eq!(*order.lock(), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_delete_disposes_single_resource() {
        let store = DisposableStore::new();
        let a = store.add(Probe::ok()).unwrap();
        let b = store.add(Probe::ok()).unwrap();

        store.delete(&a).unwrap();
        assert_eq!(a.hits(), 1);
        assert_eq!(store.len(), 1);

        store.delete(&a).unwrap();
        assert_eq!(a.hits(), 1);

        store.dispose().unwrap();
        assert_eq!(b.hits(), 1);
    }

    #[test]
    fn test_child_may_touch_store_while_disposed() {
        let store = Arc::new(DisposableStore::new());
        let s = store.clone();
        store
            .add(to_disposable(move || {
                assert!(s.is_disposed());
                assert!(s.is_empty());
            }))
            .unwrap();

        store.dispose().unwrap();
    }
}
