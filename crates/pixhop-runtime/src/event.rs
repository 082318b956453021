#![forbid(unsafe_code)]

//! Events carried from worker threads to the presentation thread.

use std::fmt;
use std::sync::Arc;

use pixhop_core::{DisplayListener, EventKind, Request};

/// One queued delivery. Immutable once enqueued.
pub enum Event {
    /// The request's outcome holds an artifact ready to show.
    Completed(Arc<Request>),
    /// The request's outcome holds a failure cause.
    Failed(Arc<Request>),
    /// Tell a listener its request was canceled before any request-bound dispatch.
    Canceled(Arc<dyn DisplayListener>),
    /// Download progress for an unfinished request.
    Progress {
        request: Arc<Request>,
        completed: u64,
        total: u64,
    },
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Completed(_) => EventKind::Completed,
            Event::Failed(_) => EventKind::Failed,
            Event::Canceled(_) => EventKind::Canceled,
            Event::Progress { .. } => EventKind::Progress,
        }
    }

    /// The request this event is about, if it is request-bound.
    #[must_use]
    pub fn request(&self) -> Option<&Arc<Request>> {
        match self {
            Event::Completed(request) | Event::Failed(request) => Some(request),
            Event::Progress { request, .. } => Some(request),
            Event::Canceled(_) => None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Completed(request) => f.debug_tuple("Completed").field(request).finish(),
            Event::Failed(request) => f.debug_tuple("Failed").field(request).finish(),
            Event::Canceled(_) => f.write_str("Canceled(..)"),
            Event::Progress {
                request,
                completed,
                total,
            } => f
                .debug_struct("Progress")
                .field("request", request)
                .field("completed", completed)
                .field("total", total)
                .finish(),
        }
    }
}
