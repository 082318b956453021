#![forbid(unsafe_code)]

//! Caller-supplied observer of a request's lifecycle.
//!
//! All callbacks run on the presentation thread. For any one request at
//! most one of `on_completed`, `on_failed` or `on_canceled` fires, and
//! `on_progress` never fires after it.

use crate::artifact::{Artifact, FailureCause, ImageFrom};
use crate::target::TargetId;

/// Observer of one display request.
pub trait DisplayListener: Send + Sync {
    /// The request was accepted and loading begins.
    fn on_started(&self) {}

    /// The artifact is now shown on `target`.
    fn on_completed(&self, uri: &str, target: TargetId, artifact: &Artifact, from: ImageFrom);

    /// Loading failed; the failure placeholder (if any) is shown.
    fn on_failed(&self, cause: &FailureCause);

    /// The request was abandoned before anything was shown.
    fn on_canceled(&self);

    /// Download progress, passed through as reported by the producer.
    fn on_progress(&self, completed: u64, total: u64) {
        let _ = (completed, total);
    }
}
