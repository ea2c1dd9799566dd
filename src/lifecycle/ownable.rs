//! # Ownable base capability.
//!
//! Components that own child resources implement [`Ownable`] by exposing a
//! private [`DisposableStore`]; the trait supplies guarded registration and the
//! cascading teardown that a component's own [`Disposable::dispose`] should call.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventkit::{Disposable, DisposableStore, Emitter, LifecycleError, Ownable};
//!
//! struct Widget {
//!     store: DisposableStore,
//!     changed: Arc<Emitter<u32>>,
//! }
//!
//! impl Widget {
//!     fn new() -> Arc<Self> {
//!         let store = DisposableStore::new();
//!         let changed = store.add(Arc::new(Emitter::new())).unwrap();
//!         Arc::new(Self { store, changed })
//!     }
//! }
//!
//! impl Ownable for Widget {
//!     fn store(&self) -> &DisposableStore {
//!         &self.store
//!     }
//! }
//!
//! impl Disposable for Widget {
//!     fn dispose(&self) -> Result<(), LifecycleError> {
//!         self.dispose_owned()
//!     }
//! }
//!
//! let w = Widget::new();
//! assert!(w.register(w.clone()).is_err());
//! w.dispose().unwrap();
//! assert!(w.changed.is_disposed());
//! ```

use std::sync::Arc;

use crate::error::LifecycleError;
use crate::lifecycle::disposable::identity;
use crate::lifecycle::{Disposable, DisposableStore};

/// Grants "owns a private store, disposed when I am disposed" to any component.
pub trait Ownable: Disposable {
    /// The component's private store.
    fn store(&self) -> &DisposableStore;

    /// Registers a child resource with this component.
    ///
    /// Fails with [`LifecycleError::SelfRegistration`] if `resource` is the
    /// component itself.
    fn register<D: Disposable + 'static>(&self, resource: Arc<D>) -> Result<Arc<D>, LifecycleError>
    where
        Self: Sized,
    {
        if std::ptr::eq(identity(&resource), self as *const Self as *const ()) {
            return Err(LifecycleError::SelfRegistration);
        }
        self.store().add(resource)
    }

    /// Disposes every registered child. Call from the component's `dispose`.
    fn dispose_owned(&self) -> Result<(), LifecycleError> {
        self.store().dispose()
    }

    /// Returns true once the component's store has been disposed.
    fn is_disposed(&self) -> bool {
        self.store().is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::to_disposable;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct Parent {
        store: DisposableStore,
        closed: AtomicBool,
    }

    impl Parent {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                store: DisposableStore::new(),
                closed: AtomicBool::new(false),
            })
        }
    }

    impl Ownable for Parent {
        fn store(&self) -> &DisposableStore {
            &self.store
        }
    }

    impl Disposable for Parent {
        fn dispose(&self) -> Result<(), LifecycleError> {
            self.closed.store(true, Ordering::SeqCst);
            self.dispose_owned()
        }
    }

    #[test]
    fn test_register_rejects_self() {
        let parent = Parent::new();
        let err = parent.register(parent.clone()).unwrap_err();
        assert!(matches!(err, LifecycleError::SelfRegistration));
        assert!(parent.store().is_empty());
    }

    #[test]
    fn test_dispose_cascades_through_tree() {
        let root = Parent::new();
        let child = root.register(Parent::new()).unwrap();
        let leaf = child.register(to_disposable(|| {})).unwrap();

        root.dispose().unwrap();

        assert!(Ownable::is_disposed(root.as_ref()));
        assert!(child.closed.load(Ordering::SeqCst));
        assert!(Ownable::is_disposed(child.as_ref()));
        assert!(!leaf.is_armed());
    }
}
