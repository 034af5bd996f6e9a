//! Progress reporting for pipeline stages.
//!
//! The pipeline advances a [`ProgressCallback`] once per completed stage.
//! Rendering (an `indicatif` bar, log lines, or nothing) is chosen by the
//! caller.

use std::sync::Arc;

/// Receives stage-level progress from an analysis run.
///
/// Implementations must be `Send + Sync` so one instance can be shared
/// with the blocking tasks of a parallel run.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of stages.
    fn set_total(&self, total: u64);

    /// Advance by `delta` stages.
    fn inc(&self, delta: u64);

    /// Describe the stage currently running.
    fn set_message(&self, msg: String);

    /// Mark the run complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
