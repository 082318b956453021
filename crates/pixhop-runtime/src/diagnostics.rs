#![forbid(unsafe_code)]

//! `tracing`-backed diagnostics sink.

use pixhop_core::{Diagnostics, DropReason, EventKind};

/// Reports dropped deliveries as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn delivery_dropped(&self, event: EventKind, reason: DropReason, request: &str) {
        tracing::warn!(
            event = event.as_str(),
            reason = reason.as_str(),
            request,
            "delivery dropped: {reason}"
        );
    }

    fn artifact_released(&self, request: &str, context: &str) {
        tracing::debug!(request, context, "artifact released");
    }
}
