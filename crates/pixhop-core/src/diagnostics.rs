#![forbid(unsafe_code)]

//! Why deliveries get dropped, and who gets told.
//!
//! Dropping an event is never an error for the producer: a worker has no
//! recovery action and the presentation layer cannot fail a display that no
//! longer matters. Drops are reported to an injected [`Diagnostics`]
//! collaborator instead of a global debug flag.

use std::fmt;

/// Kind of delivery event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Completed,
    Failed,
    Canceled,
    Progress,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a delivery was abandoned at the presentation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The target was destroyed or reassigned to another request.
    TargetGone,
    /// The request's cancel flag was set.
    RequestCanceled,
    /// The event was still queued when the delivery loop shut down.
    ShutDown,
}

impl DropReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetGone => "target_gone",
            Self::RequestCanceled => "request_canceled",
            Self::ShutDown => "shut_down",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::TargetGone => write!(f, "target is gone or reassigned"),
            DropReason::RequestCanceled => write!(f, "request was canceled"),
            DropReason::ShutDown => write!(f, "delivery loop shut down"),
        }
    }
}

impl std::error::Error for DropReason {}

/// Sink for delivery diagnostics.
pub trait Diagnostics: Send + Sync {
    /// An event for `request` was not delivered.
    fn delivery_dropped(&self, event: EventKind, reason: DropReason, request: &str);

    /// A held artifact was released without being shown.
    fn artifact_released(&self, request: &str, context: &str) {
        let _ = (request, context);
    }
}

/// Discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentDiagnostics;

impl Diagnostics for SilentDiagnostics {
    fn delivery_dropped(&self, _event: EventKind, _reason: DropReason, _request: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_reason_is_an_error() {
        let err: Box<dyn std::error::Error> = Box::new(DropReason::TargetGone);
        assert_eq!(err.to_string(), "target is gone or reassigned");
        assert_eq!(DropReason::RequestCanceled.as_str(), "request_canceled");
        assert_eq!(DropReason::ShutDown.to_string(), "delivery loop shut down");
    }

    #[test]
    fn event_kind_names() {
        let names: Vec<_> = [
            EventKind::Completed,
            EventKind::Failed,
            EventKind::Canceled,
            EventKind::Progress,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["completed", "failed", "canceled", "progress"]);
    }
}
