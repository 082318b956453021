#![forbid(unsafe_code)]

//! pixhop public facade crate.
//!
//! Re-exports the request model from `pixhop-core` and, with the default
//! `runtime` feature, the delivery machinery from `pixhop-runtime`, plus a
//! prelude for day-to-day usage.
//!
//! ```no_run
//! use pixhop::prelude::*;
//!
//! # fn main() -> pixhop::Result<()> {
//! let targets = Targets::new();
//! let config = DeliveryConfig::from_env();
//! let (dispatcher, presenter) = pixhop::start(config, targets.clone())?;
//!
//! let target = targets.insert();
//! let request = Request::builder("https://example.com/cat.png", target).build();
//! targets.assign(target, request.id());
//!
//! // on a worker thread, once the image is decoded:
//! request.complete(Artifact::new("cat", 1, 1, vec![0; 4]), ImageFrom::Network);
//! dispatcher.emit_completed(request);
//!
//! presenter.shutdown();
//! # Ok(())
//! # }
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use pixhop_core::{
    Artifact, ArtifactKind, Diagnostics, DisplayListener, Displayer, DropReason, EventKind,
    FailureCause, ImageFrom, Outcome, Request, RequestBuilder, RequestId, SetContentDisplayer,
    SilentDiagnostics, Status, Surface, TargetId, Targets,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use pixhop_runtime::{
    Delivery, DeliveryConfig, DeliveryLoop, DeliveryStats, Dispatcher, PresentationThread,
    TracingDiagnostics, delivery_channel,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for pixhop hosts.
#[derive(Debug)]
pub enum Error {
    /// The presentation thread could not be spawned.
    Spawn(std::io::Error),
    /// A delivery was abandoned at the presentation thread.
    Dropped(DropReason),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to spawn presentation thread: {err}"),
            Self::Dropped(reason) => write!(f, "delivery dropped: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Dropped(reason) => Some(reason),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(err)
    }
}

impl From<DropReason> for Error {
    fn from(reason: DropReason) -> Self {
        Self::Dropped(reason)
    }
}

/// Standard result type for pixhop APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Spawn a dedicated presentation thread bound to `targets`.
///
/// # Errors
///
/// Returns [`Error::Spawn`] if the thread cannot be created.
#[cfg(feature = "runtime")]
pub fn start(
    config: DeliveryConfig,
    targets: Targets,
) -> Result<(Dispatcher, PresentationThread)> {
    Ok(PresentationThread::spawn(config, targets)?)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Artifact, DisplayListener, Error, FailureCause, ImageFrom, Request, RequestId, Result,
        Status, TargetId, Targets,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{DeliveryConfig, Dispatcher, PresentationThread};

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use pixhop_core as core;
#[cfg(feature = "runtime")]
pub use pixhop_runtime as runtime;
