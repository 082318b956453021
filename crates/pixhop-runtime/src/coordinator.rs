#![forbid(unsafe_code)]

//! Per-event lifecycle logic, run only on the presentation thread.
//!
//! Each transition reads the request's cancel flag and the target's
//! ownership once, at the top, and acts on that single decision. Nothing
//! is re-checked halfway through.
//!
//! | Event     | canceled          | target gone                   | otherwise                              |
//! |-----------|-------------------|-------------------------------|----------------------------------------|
//! | Completed | drop, release     | drop, release                 | apply success, `Completed`, `on_completed` |
//! | Failed    | drop              | `on_canceled`                 | apply placeholder, `Failed`, `on_failed`   |
//! | Progress  | skip              | deliver                       | `on_progress` unless finished          |
//! | Canceled  | n/a               | n/a                           | `on_canceled`                          |
//!
//! The Failed row treats a missing target like a cancellation from the
//! listener's point of view, while the Completed row stays silent. That
//! asymmetry is intentional.

use std::sync::Arc;

use pixhop_core::{
    Artifact, ArtifactKind, Diagnostics, DisplayListener, DisplayerResolver, DropReason,
    EventKind, FailureCause, ImageFrom, Outcome, Request, Status, TargetId, Targets,
};

use crate::event::Event;

/// What the coordinator did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Artifact shown and `on_completed` fired (if a listener was attached).
    Completed,
    /// Placeholder shown and `on_failed` fired (if a listener was attached).
    Failed,
    /// Canceled event delivered, or a Failed event whose target was gone
    /// ended the request as `Canceled`. `on_canceled` fired if a listener was
    /// attached.
    Canceled,
    /// `on_progress` fired.
    Progress,
    /// Dropped without any listener callback.
    Dropped(DropReason),
    /// Ignored: progress for a finished or canceled request, progress with
    /// no listener, or a repeat delivery for a finished request. A Completed
    /// repeat still releases an artifact the request never showed.
    Skipped,
    /// The request's outcome did not match the event (e.g. Completed with
    /// no artifact). Producer bug; nothing is shown.
    Malformed,
}

impl Delivery {
    /// `Err` with the reason for dropped deliveries, `Ok(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] when the event was dropped.
    pub fn into_result(self) -> Result<Self, DropReason> {
        match self {
            Self::Dropped(reason) => Err(reason),
            other => Ok(other),
        }
    }
}

/// Applies queued events to targets and fires listener callbacks.
pub struct LifecycleCoordinator {
    targets: Targets,
    resolver: DisplayerResolver,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LifecycleCoordinator {
    #[must_use]
    pub fn new(
        targets: Targets,
        resolver: DisplayerResolver,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            targets,
            resolver,
            diagnostics,
        }
    }

    #[must_use]
    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Run the transition for one event.
    pub fn deliver(&self, event: Event) -> Delivery {
        match event {
            Event::Completed(request) => self.deliver_completed(&request),
            Event::Failed(request) => self.deliver_failed(&request),
            Event::Canceled(listener) => {
                listener.on_canceled();
                Delivery::Canceled
            }
            Event::Progress {
                request,
                completed,
                total,
            } => self.deliver_progress(&request, completed, total),
        }
    }

    /// Give up on an event that was still queued at shutdown.
    ///
    /// Completed events release their artifact. Completed and Failed events
    /// for unfinished requests end them as `Canceled`. No listener fires.
    pub fn abandon(&self, event: Event) -> Delivery {
        match event {
            Event::Completed(request) if request.is_finished() => self.skip_completed(&request),
            Event::Completed(request) => {
                self.discard(&request, EventKind::Completed, DropReason::ShutDown);
                Delivery::Dropped(DropReason::ShutDown)
            }
            Event::Failed(request) if request.is_finished() => Delivery::Skipped,
            Event::Failed(request) => {
                request.set_status(Status::Canceled);
                self.diagnostics
                    .delivery_dropped(EventKind::Failed, DropReason::ShutDown, request.name());
                Delivery::Dropped(DropReason::ShutDown)
            }
            Event::Canceled(_) => {
                self.diagnostics
                    .delivery_dropped(EventKind::Canceled, DropReason::ShutDown, "");
                Delivery::Dropped(DropReason::ShutDown)
            }
            Event::Progress { .. } => Delivery::Skipped,
        }
    }

    fn deliver_completed(&self, request: &Request) -> Delivery {
        if request.is_finished() {
            return self.skip_completed(request);
        }

        let canceled = request.is_canceled();
        let mut arena = self.targets.lock();
        let reason = if canceled {
            Some(DropReason::RequestCanceled)
        } else if !arena.is_still_mine(request.target(), request.id()) {
            Some(DropReason::TargetGone)
        } else {
            None
        };
        if let Some(reason) = reason {
            drop(arena);
            self.discard(request, EventKind::Completed, reason);
            return Delivery::Dropped(reason);
        }

        let Some(Outcome::Artifact { artifact, from }) = request.outcome() else {
            drop(arena);
            tracing::error!(
                request = request.name(),
                "completed event without an artifact outcome"
            );
            request.set_status(Status::Canceled);
            return Delivery::Malformed;
        };

        if let Some(surface) = arena.get_mut(request.target()) {
            self.resolver
                .resolve(request)
                .apply(surface, &artifact, ArtifactKind::Success, request);
        }
        drop(arena);
        request.set_status(Status::Completed);

        if let Some(listener) = request.listener() {
            listener.on_completed(request.uri(), request.target(), &artifact, from);
        }
        Delivery::Completed
    }

    fn deliver_failed(&self, request: &Request) -> Delivery {
        if request.is_finished() {
            return Delivery::Skipped;
        }

        if request.is_canceled() {
            request.set_status(Status::Canceled);
            self.diagnostics.delivery_dropped(
                EventKind::Failed,
                DropReason::RequestCanceled,
                request.name(),
            );
            return Delivery::Dropped(DropReason::RequestCanceled);
        }

        let mut arena = self.targets.lock();
        if !arena.is_still_mine(request.target(), request.id()) {
            drop(arena);
            request.set_status(Status::Canceled);
            self.diagnostics
                .delivery_dropped(EventKind::Failed, DropReason::TargetGone, request.name());
            if let Some(listener) = request.listener() {
                listener.on_canceled();
            }
            return Delivery::Canceled;
        }

        let Some(cause) = request.failure_cause() else {
            drop(arena);
            tracing::error!(
                request = request.name(),
                "failed event without a failure outcome"
            );
            request.set_status(Status::Canceled);
            return Delivery::Malformed;
        };

        if let (Some(placeholder), Some(surface)) = (
            request.failure_placeholder(),
            arena.get_mut(request.target()),
        ) {
            self.resolver
                .resolve(request)
                .apply(surface, placeholder, ArtifactKind::Failure, request);
        }
        drop(arena);
        request.set_status(Status::Failed);

        if let Some(listener) = request.listener() {
            listener.on_failed(&cause);
        }
        Delivery::Failed
    }

    fn deliver_progress(&self, request: &Request, completed: u64, total: u64) -> Delivery {
        if request.is_finished() || request.is_canceled() {
            return Delivery::Skipped;
        }
        match request.listener() {
            Some(listener) => {
                listener.on_progress(completed, total);
                Delivery::Progress
            }
            None => Delivery::Skipped,
        }
    }

    /// A finished request only keeps an artifact it actually showed.
    fn skip_completed(&self, request: &Request) -> Delivery {
        if request.status() != Status::Completed && request.release_artifact().is_some() {
            self.diagnostics
                .artifact_released(request.name(), "completed callback - finished");
        }
        Delivery::Skipped
    }

    fn discard(&self, request: &Request, event: EventKind, reason: DropReason) {
        if request.release_artifact().is_some() {
            self.diagnostics
                .artifact_released(request.name(), "completed callback - cancel");
        }
        request.set_status(Status::Canceled);
        self.diagnostics
            .delivery_dropped(event, reason, request.name());
    }

    // --- same-thread delivery ----------------------------------------------

    /// Fire `on_started` right away. No-op without a listener.
    pub fn fire_started(&self, listener: Option<&dyn DisplayListener>) {
        if let Some(listener) = listener {
            listener.on_started();
        }
    }

    /// Show an artifact that is already at hand (e.g. a memory-cache hit) and
    /// fire `on_completed`, bypassing the queue and the displayer.
    pub fn fire_completed(
        &self,
        target: TargetId,
        uri: &str,
        artifact: &Artifact,
        listener: Option<&dyn DisplayListener>,
        from: ImageFrom,
    ) {
        if let Some(surface) = self.targets.lock().get_mut(target) {
            surface.clear();
            surface.show(artifact.clone(), ArtifactKind::Success);
        }
        if let Some(listener) = listener {
            listener.on_completed(uri, target, artifact, from);
        }
    }

    /// Show a failure right away: the placeholder when one is given, then `on_failed`.
    pub fn fire_failed(
        &self,
        target: TargetId,
        placeholder: Option<&Artifact>,
        cause: &FailureCause,
        listener: Option<&dyn DisplayListener>,
    ) {
        if let Some(placeholder) = placeholder
            && let Some(surface) = self.targets.lock().get_mut(target)
        {
            surface.show(placeholder.clone(), ArtifactKind::Failure);
        }
        if let Some(listener) = listener {
            listener.on_failed(cause);
        }
    }
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
