#![forbid(unsafe_code)]

//! Collaborators that record what was done to them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use pixhop_core::{
    Artifact, ArtifactKind, Diagnostics, DisplayListener, Displayer, DropReason, EventKind,
    FailureCause, ImageFrom, Request, RequestId, Surface, TargetId,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerCall {
    Started,
    Completed {
        uri: String,
        target: TargetId,
        artifact_label: String,
        from: ImageFrom,
    },
    Failed(FailureCause),
    Canceled,
    Progress {
        completed: u64,
        total: u64,
    },
}

impl ListenerCall {
    /// `on_completed`, `on_failed` or `on_canceled`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed(_) | Self::Canceled
        )
    }
}

/// Listener that records every callback and the thread it ran on.
#[derive(Debug, Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<(ListenerCall, ThreadId)>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: ListenerCall) {
        lock(&self.calls).push((call, thread::current().id()));
    }

    /// Calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ListenerCall> {
        lock(&self.calls).iter().map(|(c, _)| c.clone()).collect()
    }

    /// Threads the callbacks ran on, in call order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadId> {
        lock(&self.calls).iter().map(|(_, t)| *t).collect()
    }

    #[must_use]
    pub fn terminal_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(c, _)| c.is_terminal())
            .count()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

impl DisplayListener for RecordingListener {
    fn on_started(&self) {
        self.record(ListenerCall::Started);
    }

    fn on_completed(&self, uri: &str, target: TargetId, artifact: &Artifact, from: ImageFrom) {
        self.record(ListenerCall::Completed {
            uri: uri.to_string(),
            target,
            artifact_label: artifact.label().to_string(),
            from,
        });
    }

    fn on_failed(&self, cause: &FailureCause) {
        self.record(ListenerCall::Failed(cause.clone()));
    }

    fn on_canceled(&self) {
        self.record(ListenerCall::Canceled);
    }

    fn on_progress(&self, completed: u64, total: u64) {
        self.record(ListenerCall::Progress { completed, total });
    }
}

/// One displayer application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub request: RequestId,
    pub label: String,
    pub kind: ArtifactKind,
}

/// Displayer that records applications, then sets the target's content.
#[derive(Debug, Default)]
pub struct RecordingDisplayer {
    applied: Mutex<Vec<Application>>,
}

impl RecordingDisplayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn applied(&self) -> Vec<Application> {
        lock(&self.applied).clone()
    }
}

impl Displayer for RecordingDisplayer {
    fn apply(
        &self,
        surface: &mut Surface,
        artifact: &Artifact,
        kind: ArtifactKind,
        request: &Request,
    ) {
        lock(&self.applied).push(Application {
            request: request.id(),
            label: artifact.label().to_string(),
            kind,
        });
        surface.show(artifact.clone(), kind);
    }
}

/// Reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticRecord {
    Dropped {
        event: EventKind,
        reason: DropReason,
        request: String,
    },
    Released {
        request: String,
        context: String,
    },
}

/// Diagnostics sink that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl RecordingDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        lock(&self.records).clone()
    }

    /// Drop reports only, as `(event, reason)` pairs.
    #[must_use]
    pub fn drops(&self) -> Vec<(EventKind, DropReason)> {
        lock(&self.records)
            .iter()
            .filter_map(|r| match r {
                DiagnosticRecord::Dropped { event, reason, .. } => Some((*event, *reason)),
                DiagnosticRecord::Released { .. } => None,
            })
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn delivery_dropped(&self, event: EventKind, reason: DropReason, request: &str) {
        lock(&self.records).push(DiagnosticRecord::Dropped {
            event,
            reason,
            request: request.to_string(),
        });
    }

    fn artifact_released(&self, request: &str, context: &str) {
        lock(&self.records).push(DiagnosticRecord::Released {
            request: request.to_string(),
            context: context.to_string(),
        });
    }
}
