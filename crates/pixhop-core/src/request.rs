#![forbid(unsafe_code)]

//! The lifecycle record of one in-flight display operation.
//!
//! A [`Request`] is shared (`Arc<Request>`) between the worker thread that
//! fetches and decodes the image and the presentation thread that delivers
//! the result. Both threads may read and write `status` and `canceled`, so
//! those are atomics. The outcome slot is written once by the worker before
//! the request is handed to the dispatcher and read by the presentation
//! thread afterwards.
//!
//! # Status transitions
//!
//! ```text
//! Pending ──worker──▶ WaitingDisplay ──presenter──▶ Completed | Failed | Canceled
//! ```
//!
//! `canceled` is independent of `status`: any thread may set it at any time,
//! and the presentation thread treats it as the authoritative signal when an
//! event is delivered.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::artifact::{Artifact, FailureCause, ImageFrom, Outcome};
use crate::displayer::Displayer;
use crate::listener::DisplayListener;
use crate::target::TargetId;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Build an id from a raw value. Ids built this way are not guaranteed unique.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Created, not yet produced by a worker.
    Pending = 0,
    /// Outcome attached, delivery queued but not yet run.
    WaitingDisplay = 1,
    /// Artifact applied and listener told.
    Completed = 2,
    /// Failure applied and listener told.
    Failed = 3,
    /// Delivery was abandoned.
    Canceled = 4,
}

impl Status {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::WaitingDisplay,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Canceled,
        }
    }

    /// Whether no further delivery can happen for a request in this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::WaitingDisplay => "waiting_display",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight display operation.
pub struct Request {
    id: RequestId,
    uri: String,
    name: String,
    target: TargetId,
    status: AtomicU8,
    canceled: AtomicBool,
    outcome: Mutex<Option<Outcome>>,
    displayer: Option<Arc<dyn Displayer>>,
    listener: Option<Arc<dyn DisplayListener>>,
    failure_placeholder: Option<Artifact>,
}

impl Request {
    /// Start building a request that will draw `uri` into `target`.
    pub fn builder(uri: impl Into<String>, target: TargetId) -> RequestBuilder {
        RequestBuilder::new(uri, target)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Human-readable name used in diagnostics.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Request-specific displayer, if one was configured.
    #[must_use]
    pub fn displayer(&self) -> Option<&Arc<dyn Displayer>> {
        self.displayer.as_ref()
    }

    #[must_use]
    pub fn listener(&self) -> Option<&Arc<dyn DisplayListener>> {
        self.listener.as_ref()
    }

    /// Placeholder shown on the target when loading fails.
    #[must_use]
    pub fn failure_placeholder(&self) -> Option<&Artifact> {
        self.failure_placeholder.as_ref()
    }

    // --- status -------------------------------------------------------------

    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: Status) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Mark the outcome as attached and awaiting delivery.
    ///
    /// Must be called after the outcome is set and before the request is
    /// queued, so the presentation thread observes the outcome. A request
    /// that already reached a terminal status keeps it; returns `false` then.
    pub fn to_wait_display_status(&self) -> bool {
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (!Status::from_u8(raw).is_terminal()).then_some(Status::WaitingDisplay as u8)
            })
            .is_ok()
    }

    /// Whether the request reached a terminal status.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Flag the request as canceled. Returns `true` if this call set the flag.
    pub fn cancel(&self) -> bool {
        !self.canceled.swap(true, Ordering::AcqRel)
    }

    // --- outcome ------------------------------------------------------------

    /// Attach a decoded artifact. Worker side.
    pub fn complete(&self, artifact: Artifact, from: ImageFrom) {
        *self.outcome_slot() = Some(Outcome::Artifact { artifact, from });
    }

    /// Attach a failure. Worker side.
    pub fn fail(&self, cause: FailureCause) {
        *self.outcome_slot() = Some(Outcome::Failure(cause));
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome_slot().clone()
    }

    /// The attached artifact, if the outcome is a success that has not been released.
    #[must_use]
    pub fn artifact(&self) -> Option<Artifact> {
        match &*self.outcome_slot() {
            Some(Outcome::Artifact { artifact, .. }) => Some(artifact.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn image_from(&self) -> Option<ImageFrom> {
        match &*self.outcome_slot() {
            Some(Outcome::Artifact { from, .. }) => Some(*from),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure_cause(&self) -> Option<FailureCause> {
        match &*self.outcome_slot() {
            Some(Outcome::Failure(cause)) => Some(cause.clone()),
            _ => None,
        }
    }

    /// Take the artifact out of the outcome slot.
    ///
    /// The request stops referencing the pixels; they are freed once the
    /// returned handle (and any other clone) is dropped. Failure outcomes
    /// are left in place.
    pub fn release_artifact(&self) -> Option<Artifact> {
        let mut slot = self.outcome_slot();
        match slot.take() {
            Some(Outcome::Artifact { artifact, .. }) => Some(artifact),
            other => {
                *slot = other;
                None
            }
        }
    }

    fn outcome_slot(&self) -> MutexGuard<'_, Option<Outcome>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("target", &self.target)
            .field("status", &self.status())
            .field("canceled", &self.is_canceled())
            .field("has_displayer", &self.displayer.is_some())
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Request`].
pub struct RequestBuilder {
    id: Option<RequestId>,
    uri: String,
    name: Option<String>,
    target: TargetId,
    displayer: Option<Arc<dyn Displayer>>,
    listener: Option<Arc<dyn DisplayListener>>,
    failure_placeholder: Option<Artifact>,
}

impl RequestBuilder {
    fn new(uri: impl Into<String>, target: TargetId) -> Self {
        Self {
            id: None,
            uri: uri.into(),
            name: None,
            target,
            displayer: None,
            listener: None,
            failure_placeholder: None,
        }
    }

    /// Use a specific id instead of allocating one.
    #[must_use]
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Diagnostic name. Defaults to the uri.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn displayer(mut self, displayer: Arc<dyn Displayer>) -> Self {
        self.displayer = Some(displayer);
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn DisplayListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn failure_placeholder(mut self, placeholder: Artifact) -> Self {
        self.failure_placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Request> {
        let name = self.name.unwrap_or_else(|| self.uri.clone());
        Arc::new(Request {
            id: self.id.unwrap_or_else(RequestId::next),
            uri: self.uri,
            name,
            target: self.target,
            status: AtomicU8::new(Status::Pending as u8),
            canceled: AtomicBool::new(false),
            outcome: Mutex::new(None),
            displayer: self.displayer,
            listener: self.listener,
            failure_placeholder: self.failure_placeholder,
        })
    }
}
