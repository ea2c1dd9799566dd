//! Event sources: emitter, options, leak detection and profiling.
//!
//! ## Contents
//! - [`Emitter`], [`Event`], [`Subscription`] publish/subscribe core
//! - [`EmitterOptions`] construction-time hooks and diagnostics
//! - [`LeakMonitor`] listener leak sampling, plus the process-wide threshold
//!   ([`set_global_leak_warning_threshold`], [`ThresholdGuard`])
//!
//! ## Quick reference
//! - **Producers** own an `Emitter` and call `fire`.
//! - **Consumers** receive an `Event` and keep the returned `Subscription`
//!   (or push it into a [`DisposableStore`](crate::DisposableStore)).

mod emitter;
mod leak;
mod options;
mod profiling;

pub use emitter::{Emitter, Event, Subscription};
pub use leak::{
    CallSite, LeakMonitor, ThresholdGuard, global_leak_warning_threshold,
    set_global_leak_warning_threshold,
};
pub use options::{EmitterOptions, Hook};
