//! # Listener leak detection.
//!
//! [`LeakMonitor`] samples the call site of every subscription made while an
//! emitter holds more listeners than its threshold, and periodically logs the
//! most frequent one.
//!
//! ## Backoff
//! ```text
//! threshold T = 4
//! listeners:  1 2 3 4 | 5      6      7      | 8 ...
//!                     | warn   -      warn   | ...
//!                     └─ countdown resets to ceil(T * 0.5) after each warning
//! ```
//!
//! ## Rules
//! - Threshold resolution: per-emitter value if set, else the process-wide value.
//! - Threshold `<= 0` disables sampling entirely.
//! - Disposing a sampled subscription releases its sample.
//! - The process-wide threshold is a single global; [`set_global_leak_warning_threshold`]
//!   returns a guard that restores the previous value.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::error::LifecycleError;
use crate::lifecycle::Disposable;

/// Process-wide leak threshold. Disabled by default.
static GLOBAL_LEAK_WARNING_THRESHOLD: AtomicI64 = AtomicI64::new(-1);

/// Returns the current process-wide leak threshold.
pub fn global_leak_warning_threshold() -> i64 {
    GLOBAL_LEAK_WARNING_THRESHOLD.load(Ordering::SeqCst)
}

/// Sets the process-wide leak threshold (`<= 0` disables detection).
///
/// The previous value is restored when the returned guard is disposed or dropped.
///
/// ```
/// use eventkit::{global_leak_warning_threshold, set_global_leak_warning_threshold};
///
/// let before = global_leak_warning_threshold();
/// {
///     let _guard = set_global_leak_warning_threshold(10);
///     assert_eq!(global_leak_warning_threshold(), 10);
/// }
/// assert_eq!(global_leak_warning_threshold(), before);
/// ```
pub fn set_global_leak_warning_threshold(threshold: i64) -> ThresholdGuard {
    let previous = GLOBAL_LEAK_WARNING_THRESHOLD.swap(threshold, Ordering::SeqCst);
    ThresholdGuard {
        previous,
        restored: AtomicBool::new(false),
    }
}

/// Restores the previous process-wide threshold exactly once.
#[must_use = "dropping the guard immediately restores the previous threshold"]
#[derive(Debug)]
pub struct ThresholdGuard {
    previous: i64,
    restored: AtomicBool,
}

impl ThresholdGuard {
    fn restore(&self) {
        if !self.restored.swap(true, Ordering::SeqCst) {
            GLOBAL_LEAK_WARNING_THRESHOLD.store(self.previous, Ordering::SeqCst);
        }
    }
}

impl Disposable for ThresholdGuard {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.restore();
        Ok(())
    }
}

impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Call site that subscribed a listener.
pub type CallSite = &'static Location<'static>;

#[derive(Default)]
struct LeakState {
    sites: HashMap<CallSite, usize>,
    warn_countdown: i64,
    warnings: usize,
}

/// Per-emitter leak sampler.
pub struct LeakMonitor {
    name: String,
    custom_threshold: Option<i64>,
    state: Mutex<LeakState>,
}

impl LeakMonitor {
    /// Creates a monitor labelled `name` (used in warnings).
    pub fn new(name: impl Into<String>, custom_threshold: Option<i64>) -> Self {
        Self {
            name: name.into(),
            custom_threshold,
            state: Mutex::new(LeakState::default()),
        }
    }

    /// Effective threshold for this monitor.
    pub fn threshold(&self) -> i64 {
        self.custom_threshold
            .unwrap_or_else(global_leak_warning_threshold)
    }

    /// Records a subscription from `site` made while `listener_count` listeners exist.
    ///
    /// Returns true if the sample was recorded (and must later be [`released`](Self::release)).
    pub fn check(&self, site: CallSite, listener_count: usize) -> bool {
        let threshold = self.threshold();
        if threshold <= 0 || (listener_count as i64) <= threshold {
            return false;
        }

        let warning = {
            let mut state = self.state.lock();
            *state.sites.entry(site).or_insert(0) += 1;
            state.warn_countdown -= 1;

            if state.warn_countdown <= 0 {
                state.warn_countdown = (threshold + 1) / 2;
                state.warnings += 1;
                top_site(&state.sites)
            } else {
                None
            }
        };

        if let Some((top, top_count)) = warning {
            tracing::warn!(
                emitter = %self.name,
                listeners = listener_count,
                threshold,
                top_count,
                site = %top,
                "potential listener leak detected; most frequent subscribing call site"
            );
        }
        true
    }

    /// Undoes one sample from `site`.
    pub fn release(&self, site: CallSite) {
        let mut state = self.state.lock();
        if let Some(count) = state.sites.get_mut(site) {
            *count -= 1;
            if *count == 0 {
                state.sites.remove(site);
            }
        }
    }

    /// Most frequently sampled call site and its live count.
    pub fn most_frequent(&self) -> Option<(CallSite, usize)> {
        top_site(&self.state.lock().sites)
    }

    /// Number of warnings logged so far.
    pub fn warning_count(&self) -> usize {
        self.state.lock().warnings
    }

    /// Drops all samples and resets the countdown.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.sites.clear();
        state.warn_countdown = 0;
    }
}

impl Disposable for LeakMonitor {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.reset();
        Ok(())
    }
}

/// Highest count wins; ties go to the earliest location for stable output.
fn top_site(sites: &HashMap<CallSite, usize>) -> Option<(CallSite, usize)> {
    sites
        .iter()
        .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then_with(|| lb.cmp(la)))
        .map(|(site, count)| (*site, *count))
}
