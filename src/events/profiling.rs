//! # Fire timing instrumentation.
//!
//! Enabled per emitter by [`EmitterOptions::diagnostics_name`](crate::EmitterOptions::diagnostics_name).
//! Each `fire` that reaches listeners is timed and logged with running totals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Disambiguates emitters sharing a diagnostics name.
static PROFILING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Default)]
struct Totals {
    invocations: u64,
    elapsed_overall: Duration,
}

pub(crate) struct EventProfiling {
    name: String,
    totals: Mutex<Totals>,
}

impl EventProfiling {
    pub(crate) fn new(name: &str) -> Self {
        let id = PROFILING_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{name}_{id}"),
            totals: Mutex::new(Totals::default()),
        }
    }

    pub(crate) fn start(&self) -> Instant {
        Instant::now()
    }

    pub(crate) fn stop(&self, started: Instant, listener_count: usize) {
        let elapsed = started.elapsed();
        let (invocations, overall) = {
            let mut totals = self.totals.lock();
            totals.invocations += 1;
            totals.elapsed_overall += elapsed;
            (totals.invocations, totals.elapsed_overall)
        };

        tracing::info!(
            emitter = %self.name,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            listeners = listener_count,
            elapsed_overall_ms = overall.as_secs_f64() * 1000.0,
            invocations,
            "did fire"
        );
    }

    #[cfg(test)]
    pub(crate) fn invocations(&self) -> u64 {
        self.totals.lock().invocations
    }
}
