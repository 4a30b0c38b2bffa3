//! Progress reporting for file loads.
//!
//! Raw incident files can run to millions of rows. Readers in this crate
//! report through [`ProgressCallback`] so the binary can render a progress
//! bar while tests and library callers pass [`NullProgress`].

/// Number of records between progress updates while reading.
pub const REPORT_EVERY: u64 = 10_000;

/// Receives progress updates from a long-running read.
pub trait ProgressCallback: Send + Sync {
    /// Advance progress by `delta` records.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Discards every progress update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
