//! Progress reporting for long fetches (range probes, multi-county runs).
//!
//! Library code reports through [`ProgressCallback`]; the binary decides
//! whether that becomes a terminal progress bar or nothing at all.

use std::sync::Arc;

/// Receiver of progress updates. Shared across tasks behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total units of work once known.
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    /// Marks the work as complete.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
