//! Error types used by the lifecycle, event and throttling layers.
//!
//! This module defines three error enums:
//!
//! - [`LifecycleError`] - errors raised while registering or disposing resources.
//! - [`EmitterError`] - errors raised by a listener during [`Emitter::fire`](crate::Emitter::fire).
//! - [`ThrottlerError`] - errors observed by a caller waiting on a queued task.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// Boxed, thread-safe error used for failures that originate in user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the ownership graph.
///
/// A single failed disposal is reported as-is; two or more failures from one
/// sweep are collected into [`LifecycleError::Aggregate`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A disposable tried to register itself as its own owned resource.
    #[error("cannot register a disposable on itself")]
    SelfRegistration,

    /// A resource failed while being disposed.
    #[error("dispose failed: {source}")]
    Failed {
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// Several owned resources failed during one disposal sweep.
    #[error("encountered {} errors while disposing of store", .0.len())]
    Aggregate(Vec<LifecycleError>),
}

impl LifecycleError {
    /// Wraps an arbitrary error as a disposal failure.
    pub fn failed(source: impl Into<BoxError>) -> Self {
        LifecycleError::Failed {
            source: source.into(),
        }
    }

    /// Collapses a list of sweep failures: none → `Ok`, one → that error, more → `Aggregate`.
    pub(crate) fn from_sweep(mut errors: Vec<LifecycleError>) -> Result<(), LifecycleError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LifecycleError::Aggregate(errors)),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventkit::LifecycleError;
    ///
    /// let err = LifecycleError::SelfRegistration;
    /// assert_eq!(err.as_label(), "lifecycle_self_registration");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::SelfRegistration => "lifecycle_self_registration",
            LifecycleError::Failed { .. } => "lifecycle_dispose_failed",
            LifecycleError::Aggregate(_) => "lifecycle_dispose_aggregate",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LifecycleError::SelfRegistration => "self registration".to_string(),
            LifecycleError::Failed { source } => format!("dispose failed: {source}"),
            LifecycleError::Aggregate(errors) => {
                let inner: Vec<String> = errors.iter().map(|e| e.as_message()).collect();
                format!("{} dispose failures: [{}]", errors.len(), inner.join("; "))
            }
        }
    }

    /// Returns the individual failures: the inner list for `Aggregate`, otherwise `self`.
    pub fn failures(&self) -> Vec<&LifecycleError> {
        match self {
            LifecycleError::Aggregate(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

/// # Errors produced while delivering an event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EmitterError {
    /// A listener returned an error; the rest of the delivery pass was abandoned.
    #[error("listener failed: {source}")]
    Delivery {
        /// The listener's error.
        #[source]
        source: BoxError,
    },
}

impl EmitterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EmitterError::Delivery { .. } => "emitter_delivery_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EmitterError::Delivery { source } => format!("delivery: {source}"),
        }
    }
}

/// # Errors observed by a throttler caller.
///
/// The task's own outcome is carried inside `R`; these variants only describe
/// why no result could be produced at all.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlerError {
    /// The throttler was disposed before the task ran.
    #[error("throttler disposed before the task completed")]
    Disposed,

    /// The task was dropped without producing a result (e.g. it panicked).
    #[error("task abandoned without a result")]
    Abandoned,
}

impl ThrottlerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventkit::ThrottlerError;
    ///
    /// assert_eq!(ThrottlerError::Disposed.as_label(), "throttler_disposed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ThrottlerError::Disposed => "throttler_disposed",
            ThrottlerError::Abandoned => "throttler_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}
