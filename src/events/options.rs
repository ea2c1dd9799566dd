//! # Construction-time configuration for an [`Emitter`](crate::Emitter).
//!
//! [`EmitterOptions`] centralizes lifecycle hooks and diagnostics settings.
//!
//! ## Hooks
//! ```text
//! subscribe #1 ─► on_first_listener_add ─► record ─► on_first_listener_did_add ─► on_listener_did_add
//! subscribe #n ────────────────────────────► record ───────────────────────────► on_listener_did_add
//! last dispose ─► remove ─► on_last_listener_remove
//! emitter.dispose() ─────► on_last_listener_remove (once)
//! ```
//!
//! ## Sentinel values
//! - `leak_warning_threshold = None` → use the process-wide threshold
//! - effective threshold ([`LeakMonitor::threshold`](crate::LeakMonitor::threshold)) `<= 0` → leak detection disabled
//! - `diagnostics_name = None` → no fire profiling

use std::fmt;
use std::sync::Arc;

/// Zero-argument lifecycle hook.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Configuration for an emitter.
///
/// All fields are public; the `with_*` builders are shorthand.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use eventkit::{Emitter, EmitterOptions};
///
/// let started = Arc::new(AtomicBool::new(false));
/// let s = started.clone();
///
/// let emitter: Emitter<u8> = Emitter::with_options(
///     EmitterOptions::default()
///         .with_first_listener_add(move || s.store(true, Ordering::SeqCst))
///         .with_leak_warning_threshold(64),
/// );
///
/// let sub = emitter.subscribe(|_| {});
/// assert!(started.load(Ordering::SeqCst));
/// sub.dispose();
/// ```
#[derive(Clone, Default)]
pub struct EmitterOptions {
    /// Runs before the first listener is recorded (e.g. to start an upstream producer).
    pub on_first_listener_add: Option<Hook>,

    /// Runs after the first listener has been recorded.
    pub on_first_listener_did_add: Option<Hook>,

    /// Runs after every listener is recorded.
    pub on_listener_did_add: Option<Hook>,

    /// Runs when the listener set becomes empty, and once on emitter disposal.
    pub on_last_listener_remove: Option<Hook>,

    /// Per-emitter leak threshold overriding the process-wide value.
    pub leak_warning_threshold: Option<i64>,

    /// Label enabling fire timing instrumentation.
    pub diagnostics_name: Option<String>,
}

impl EmitterOptions {
    /// Sets [`on_first_listener_add`](Self::on_first_listener_add).
    pub fn with_first_listener_add(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_first_listener_add = Some(Arc::new(hook));
        self
    }

    /// Sets [`on_first_listener_did_add`](Self::on_first_listener_did_add).
    pub fn with_first_listener_did_add(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_first_listener_did_add = Some(Arc::new(hook));
        self
    }

    /// Sets [`on_listener_did_add`](Self::on_listener_did_add).
    pub fn with_listener_did_add(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_listener_did_add = Some(Arc::new(hook));
        self
    }

    /// Sets [`on_last_listener_remove`](Self::on_last_listener_remove).
    pub fn with_last_listener_remove(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_last_listener_remove = Some(Arc::new(hook));
        self
    }

    /// Sets [`leak_warning_threshold`](Self::leak_warning_threshold).
    pub fn with_leak_warning_threshold(mut self, threshold: i64) -> Self {
        self.leak_warning_threshold = Some(threshold);
        self
    }

    /// Sets [`diagnostics_name`](Self::diagnostics_name).
    pub fn with_diagnostics_name(mut self, name: impl Into<String>) -> Self {
        self.diagnostics_name = Some(name.into());
        self
    }
}

impl fmt::Debug for EmitterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterOptions")
            .field("on_first_listener_add", &self.on_first_listener_add.is_some())
            .field("on_first_listener_did_add", &self.on_first_listener_did_add.is_some())
            .field("on_listener_did_add", &self.on_listener_did_add.is_some())
            .field("on_last_listener_remove", &self.on_last_listener_remove.is_some())
            .field("leak_warning_threshold", &self.leak_warning_threshold)
            .field("diagnostics_name", &self.diagnostics_name)
            .finish()
    }
}
