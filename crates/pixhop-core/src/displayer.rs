#![forbid(unsafe_code)]

//! Strategies that put an artifact onto a target.
//!
//! A request may carry its own [`Displayer`]; otherwise the process-wide
//! default configured on the delivery loop is used. [`DisplayerResolver`]
//! makes that choice at the point of use.

use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactKind};
use crate::request::Request;
use crate::target::Surface;

/// Applies an artifact to a live target. Only called on the presentation thread.
///
/// `apply` runs while the target arena is locked, so implementations must
/// not call back into [`Targets`](crate::Targets). Everything a displayer
/// needs is in its arguments.
///
/// ```
/// use pixhop_core::{Artifact, ArtifactKind, Displayer, Request, Surface, Targets};
///
/// /// Keeps the previous image instead of showing failure placeholders.
/// struct KeepOnFailure;
///
/// impl Displayer for KeepOnFailure {
///     fn apply(&self, surface: &mut Surface, artifact: &Artifact, kind: ArtifactKind, _: &Request) {
///         if kind == ArtifactKind::Success {
///             surface.show(artifact.clone(), kind);
///         }
///     }
/// }
///
/// let targets = Targets::new();
/// let target = targets.insert();
/// let request = Request::builder("img://a", target).build();
///
/// let mut arena = targets.lock();
/// // what a displayer would see if it reached for the arena
/// assert!(targets.try_lock().is_none());
/// let surface = arena.get_mut(target).expect("live target");
/// let placeholder = Artifact::placeholder("broken");
/// KeepOnFailure.apply(surface, &placeholder, ArtifactKind::Failure, &request);
/// assert!(surface.content().is_none());
/// ```
pub trait Displayer: Send + Sync {
    fn apply(
        &self,
        surface: &mut Surface,
        artifact: &Artifact,
        kind: ArtifactKind,
        request: &Request,
    );
}

/// Replaces the target's content with the artifact, no transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetContentDisplayer;

impl Displayer for SetContentDisplayer {
    fn apply(
        &self,
        surface: &mut Surface,
        artifact: &Artifact,
        kind: ArtifactKind,
        _request: &Request,
    ) {
        surface.show(artifact.clone(), kind);
    }
}

/// Picks the request's own displayer, falling back to a default.
#[derive(Clone)]
pub struct DisplayerResolver {
    default: Arc<dyn Displayer>,
}

impl DisplayerResolver {
    #[must_use]
    pub fn new(default: Arc<dyn Displayer>) -> Self {
        Self { default }
    }

    #[must_use]
    pub fn default_displayer(&self) -> &Arc<dyn Displayer> {
        &self.default
    }

    #[must_use]
    pub fn resolve<'a>(&'a self, request: &'a Request) -> &'a dyn Displayer {
        &**request.displayer().unwrap_or(&self.default)
    }
}

impl Default for DisplayerResolver {
    fn default() -> Self {
        Self::new(Arc::new(SetContentDisplayer))
    }
}

impl std::fmt::Debug for DisplayerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayerResolver").finish_non_exhaustive()
    }
}
