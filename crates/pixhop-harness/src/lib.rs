#![forbid(unsafe_code)]

//! Test doubles and fixtures for pixhop.
//!
//! - [`RecordingListener`], [`RecordingDisplayer`], [`RecordingDiagnostics`]
//!   capture what the delivery loop did, in order.
//! - [`Scene`] wires targets, a dispatcher and a delivery loop together;
//!   the test thread drives delivery with [`Scene::pump`].
//! - [`log_capture`] collects `tracing` events for assertions.
//!
//! The `pixhop-demo` binary in this crate is the reference application.

pub mod log_capture;
pub mod recording;
pub mod scene;

pub use log_capture::{CapturedEvent, EventCapture, with_captured_events};
pub use recording::{
    Application, DiagnosticRecord, ListenerCall, RecordingDiagnostics, RecordingDisplayer,
    RecordingListener,
};
pub use scene::{Scene, artifact, finish_ok};
