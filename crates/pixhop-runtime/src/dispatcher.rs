#![forbid(unsafe_code)]

//! Worker-side entry points into the delivery queue.
//!
//! A [`Dispatcher`] is the sending half of an unbounded many-producer,
//! single-consumer channel whose receiving half is a
//! [`DeliveryLoop`](crate::DeliveryLoop). Clone it freely and hand a copy to
//! every worker thread. All emits are fire-and-forget: they never block and
//! never report failure. Once the presentation context is gone they degrade
//! to no-ops.

use std::sync::Arc;
use std::sync::mpsc;

use pixhop_core::{DisplayListener, Request};

use crate::event::Event;

pub(crate) enum Command {
    Deliver(Event),
    Shutdown,
}

/// Cloneable, thread-safe handle for emitting delivery events.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<Command>,
}

impl Dispatcher {
    pub(crate) fn new(sender: mpsc::Sender<Command>) -> Self {
        Self { sender }
    }

    /// Queue delivery of a request whose outcome holds an artifact.
    pub fn emit_completed(&self, request: Arc<Request>) {
        request.to_wait_display_status();
        self.send(Command::Deliver(Event::Completed(request)));
    }

    /// Queue delivery of a request whose outcome holds a failure cause.
    pub fn emit_failed(&self, request: Arc<Request>) {
        request.to_wait_display_status();
        self.send(Command::Deliver(Event::Failed(request)));
    }

    /// Queue an `on_canceled` notification. No-op without a listener.
    pub fn emit_canceled(&self, listener: Option<Arc<dyn DisplayListener>>) {
        let Some(listener) = listener else {
            return;
        };
        self.send(Command::Deliver(Event::Canceled(listener)));
    }

    /// Queue a progress tick. Counters are delivered verbatim.
    pub fn emit_progress(&self, request: Arc<Request>, completed: u64, total: u64) {
        self.send(Command::Deliver(Event::Progress {
            request,
            completed,
            total,
        }));
    }

    /// Ask the delivery loop to stop after everything queued before this call.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        let Err(mpsc::SendError(command)) = self.sender.send(command) else {
            return;
        };
        if let Command::Deliver(event) = command {
            tracing::trace!(
                event = event.kind().as_str(),
                "presentation context gone, event discarded"
            );
            if let Event::Completed(request) = event {
                request.release_artifact();
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
