#![forbid(unsafe_code)]

//! A presentation context wired up for tests: targets, a dispatcher, a
//! delivery loop driven on the current thread, and recording collaborators.

use std::sync::Arc;

use pixhop_core::{Artifact, ImageFrom, Request, RequestId, TargetId, Targets};
use pixhop_runtime::{DeliveryConfig, DeliveryLoop, DeliveryStats, Dispatcher, delivery_channel};

use crate::recording::{RecordingDiagnostics, RecordingDisplayer, RecordingListener};

/// Test scene. The thread that calls [`Scene::pump`] is the presentation thread.
pub struct Scene {
    pub targets: Targets,
    pub dispatcher: Dispatcher,
    pub delivery: DeliveryLoop,
    pub displayer: Arc<RecordingDisplayer>,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        let targets = Targets::new();
        let displayer = Arc::new(RecordingDisplayer::new());
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let config = DeliveryConfig::default()
            .with_default_displayer(displayer.clone())
            .with_diagnostics(diagnostics.clone());
        let (dispatcher, delivery) = delivery_channel(&config, targets.clone());
        Self {
            targets,
            dispatcher,
            delivery,
            displayer,
            diagnostics,
        }
    }

    /// Create a target and bind a new request for `uri` to it.
    pub fn bind(&self, uri: &str, listener: Arc<RecordingListener>) -> Arc<Request> {
        let target = self.targets.insert();
        self.bind_to(target, uri, listener)
    }

    /// Bind a new request for `uri` to an existing target, displacing
    /// whatever request was assigned before.
    pub fn bind_to(
        &self,
        target: TargetId,
        uri: &str,
        listener: Arc<RecordingListener>,
    ) -> Arc<Request> {
        let request = Request::builder(uri, target)
            .listener(listener)
            .failure_placeholder(Artifact::placeholder("failed-placeholder"))
            .build();
        self.targets.assign(target, request.id());
        request
    }

    /// Point the target at some other request, leaving the old one uncanceled.
    pub fn reassign(&self, target: TargetId) -> RequestId {
        let other = RequestId::next();
        self.targets.assign(target, other);
        other
    }

    /// Destroy the target.
    pub fn remove_target(&self, target: TargetId) {
        self.targets.remove(target);
    }

    /// Deliver everything queued, on the current thread.
    pub fn pump(&mut self) -> usize {
        self.delivery.pump()
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.delivery.stats()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded artifact with `len` bytes of pixels.
#[must_use]
pub fn artifact(label: &str, len: usize) -> Artifact {
    Artifact::new(label, 1, 1, vec![0; len])
}

/// Simulate a worker finishing successfully and emitting the result.
pub fn finish_ok(
    dispatcher: &Dispatcher,
    request: &Arc<Request>,
    artifact: Artifact,
    from: ImageFrom,
) {
    request.complete(artifact, from);
    dispatcher.emit_completed(request.clone());
}
