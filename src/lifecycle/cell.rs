//! # One-shot disposal cell.
//!
//! [`DisposeCell`] holds at most one pending teardown callback.
//!
//! ## States
//! ```text
//!            arm(cb)                fire()
//! unarmed ─────────────► armed(cb) ───────► unarmed   (cb ran once)
//!    ▲                       │
//!    └─────── disarm() ──────┘                         (cb dropped, not run)
//! ```
//!
//! ## Rules
//! - `fire` is idempotent: only the first call after `arm` runs the callback.
//! - The callback runs with no internal lock held, so it may touch the cell again.
//! - Subscriptions are built on this cell: subscribing arms it with "remove me",
//!   disposing the subscription fires it.

use std::fmt;

use parking_lot::Mutex;

use crate::error::LifecycleError;
use crate::lifecycle::Disposable;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Mutable cell holding an optional one-shot callback.
pub struct DisposeCell {
    callback: Mutex<Option<Callback>>,
}

impl DisposeCell {
    /// Creates an unarmed cell.
    pub fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    /// Creates a cell already armed with `callback`.
    pub fn armed(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    /// Arms the cell. A previously pending callback is dropped without running.
    pub fn arm(&self, callback: impl FnOnce() + Send + 'static) -> &Self {
        let previous = self.callback.lock().replace(Box::new(callback));
        drop(previous);
        self
    }

    /// Clears the callback without invoking it.
    pub fn disarm(&self) {
        let previous = self.callback.lock().take();
        drop(previous);
    }

    /// Returns true if a callback is pending.
    pub fn is_armed(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Runs the pending callback, if any, and leaves the cell unarmed.
    pub fn fire(&self) {
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Default for DisposeCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DisposeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeCell")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Disposable for DisposeCell {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.fire();
        Ok(())
    }
}
