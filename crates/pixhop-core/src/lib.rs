#![forbid(unsafe_code)]

//! Core data model for pixhop.
//!
//! This crate holds the pieces that both sides of the thread boundary agree
//! on: the [`Request`] lifecycle record, the generational [`TargetArena`]
//! that backs display targets, decoded [`Artifact`]s, and the collaborator
//! traits ([`DisplayListener`], [`Displayer`], [`Diagnostics`]).
//!
//! It spawns no threads. Queuing and delivery live in `pixhop-runtime`.

pub mod artifact;
pub mod diagnostics;
pub mod displayer;
pub mod listener;
pub mod request;
pub mod target;

pub use artifact::{
    Artifact, ArtifactKind, FailureCause, ImageData, ImageFrom, Outcome, WeakArtifact,
};
pub use diagnostics::{Diagnostics, DropReason, EventKind, SilentDiagnostics};
pub use displayer::{Displayer, DisplayerResolver, SetContentDisplayer};
pub use listener::DisplayListener;
pub use request::{Request, RequestBuilder, RequestId, Status};
pub use target::{Shown, Surface, TargetArena, TargetId, Targets};
