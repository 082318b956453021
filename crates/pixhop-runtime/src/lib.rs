#![forbid(unsafe_code)]

//! pixhop runtime
//!
//! Moves image-load results from worker threads onto one presentation
//! thread and applies them there, exactly once, to targets that may have
//! been reassigned or destroyed in the meantime.
//!
//! # Key Components
//!
//! - [`Dispatcher`] - the four worker-side entry points (`emit_completed`,
//!   `emit_failed`, `emit_canceled`, `emit_progress`)
//! - [`DeliveryLoop`] - single-consumer drain loop, driven by the presentation thread
//! - [`LifecycleCoordinator`] - per-event staleness checks and state transitions
//! - [`PresentationThread`] - optional dedicated thread running a `DeliveryLoop`
//! - [`DeliveryConfig`] - default displayer, diagnostics and thread naming
//!
//! # How it fits together
//!
//! ```text
//! worker ──emit_*──▶ mpsc channel ──▶ DeliveryLoop ──▶ LifecycleCoordinator
//!                                                        ├─ Displayer::apply (target)
//!                                                        └─ DisplayListener callbacks
//! ```
//!
//! All events for one request travel through the same FIFO channel, so
//! progress emitted before completion is always delivered first.

pub mod config;
pub mod coordinator;
pub mod delivery_loop;
pub mod diagnostics;
pub mod dispatcher;
pub mod event;
pub mod presentation_thread;

pub use config::{DeliveryConfig, ENV_LOG_DROPS, ENV_THREAD_NAME};
pub use coordinator::{Delivery, LifecycleCoordinator};
pub use delivery_loop::{DeliveryLoop, DeliveryStats, delivery_channel};
pub use diagnostics::TracingDiagnostics;
pub use dispatcher::Dispatcher;
pub use event::Event;
pub use presentation_thread::PresentationThread;
