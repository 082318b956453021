#![forbid(unsafe_code)]

//! The consumer side of the delivery channel.
//!
//! A [`DeliveryLoop`] owns the receiving half of the channel and a
//! [`LifecycleCoordinator`]. Whatever thread drives it becomes the
//! presentation thread: all listener callbacks and target mutations happen
//! there, in enqueue order.
//!
//! Two ways to drive it:
//!
//! - [`DeliveryLoop::run`] blocks on the channel until every [`Dispatcher`]
//!   is dropped or [`Dispatcher::shutdown`] is observed.
//! - [`DeliveryLoop::pump`] drains whatever is queued and returns, for hosts
//!   that already own an event loop.
//!
//! Events still queued behind a shutdown, or left behind when the loop is
//! dropped, are abandoned: no listener fires and Completed events release
//! their artifact.

use std::sync::mpsc;
use std::time::Duration;

use pixhop_core::{DisplayerResolver, DropReason, Targets};
use tracing::debug_span;

use crate::config::DeliveryConfig;
use crate::coordinator::{Delivery, LifecycleCoordinator};
use crate::dispatcher::{Command, Dispatcher};
use crate::event::Event;

/// Counters kept by a delivery loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub completed: u64,
    pub failed: u64,
    pub canceled: u64,
    pub progress: u64,
    pub dropped_target_gone: u64,
    pub dropped_canceled: u64,
    pub dropped_shut_down: u64,
    pub skipped: u64,
    pub malformed: u64,
}

impl DeliveryStats {
    fn record(&mut self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Completed => &mut self.completed,
            Delivery::Failed => &mut self.failed,
            Delivery::Canceled => &mut self.canceled,
            Delivery::Progress => &mut self.progress,
            Delivery::Dropped(DropReason::TargetGone) => &mut self.dropped_target_gone,
            Delivery::Dropped(DropReason::RequestCanceled) => &mut self.dropped_canceled,
            Delivery::Dropped(DropReason::ShutDown) => &mut self.dropped_shut_down,
            Delivery::Skipped => &mut self.skipped,
            Delivery::Malformed => &mut self.malformed,
        };
        *counter += 1;
    }

    /// Requests ended by delivery as completed, failed or canceled. The
    /// matching listener callback fired when a listener was attached.
    #[must_use]
    pub fn terminal(&self) -> u64 {
        self.completed + self.failed + self.canceled
    }

    /// Events dropped without a listener callback.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped_target_gone + self.dropped_canceled + self.dropped_shut_down
    }

    /// Every event the loop has processed.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.terminal() + self.progress + self.dropped() + self.skipped + self.malformed
    }
}

/// Create a delivery channel bound to `targets`.
///
/// The returned [`Dispatcher`] may be cloned and sent to any thread. The
/// [`DeliveryLoop`] must be driven from the presentation thread.
#[must_use]
pub fn delivery_channel(config: &DeliveryConfig, targets: Targets) -> (Dispatcher, DeliveryLoop) {
    let (sender, receiver) = mpsc::channel();
    let coordinator = LifecycleCoordinator::new(
        targets,
        DisplayerResolver::new(config.default_displayer.clone()),
        config.resolve_diagnostics(),
    );
    (
        Dispatcher::new(sender),
        DeliveryLoop {
            receiver,
            coordinator,
            stats: DeliveryStats::default(),
            shut_down: false,
        },
    )
}

/// Single-consumer drain loop.
#[derive(Debug)]
pub struct DeliveryLoop {
    receiver: mpsc::Receiver<Command>,
    coordinator: LifecycleCoordinator,
    stats: DeliveryStats,
    shut_down: bool,
}

impl DeliveryLoop {
    /// Block and deliver events until shutdown or until every dispatcher is gone.
    pub fn run(&mut self) -> DeliveryStats {
        tracing::debug!("delivery loop started");
        while !self.shut_down {
            match self.receiver.recv() {
                Ok(command) => {
                    self.handle(command);
                }
                Err(_) => break,
            }
        }
        tracing::debug!(
            processed = self.stats.processed(),
            shut_down = self.shut_down,
            "delivery loop finished"
        );
        self.stats
    }

    /// Deliver everything currently queued without blocking.
    ///
    /// Returns the number of events delivered.
    pub fn pump(&mut self) -> usize {
        if self.shut_down {
            self.abandon_queued();
            return 0;
        }
        let mut delivered = 0;
        while !self.shut_down {
            match self.receiver.try_recv() {
                Ok(command) => delivered += usize::from(self.handle(command)),
                Err(_) => break,
            }
        }
        delivered
    }

    /// Wait up to `timeout` for the first event, then drain the rest.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        if self.shut_down {
            self.abandon_queued();
            return 0;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(command) => usize::from(self.handle(command)) + self.pump(),
            Err(_) => 0,
        }
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// Whether a shutdown command has been processed.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Coordinator for same-thread deliveries (`fire_*`).
    #[must_use]
    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    /// Returns `true` if the command was an event.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Deliver(event) => {
                self.deliver(event);
                true
            }
            Command::Shutdown => {
                tracing::debug!("delivery loop shutdown requested");
                self.shut_down = true;
                self.abandon_queued();
                false
            }
        }
    }

    fn deliver(&mut self, event: Event) {
        let kind = event.kind();
        let request = event.request().map(|r| r.id().get());
        let _span = debug_span!(
            "pixhop.deliver",
            event = kind.as_str(),
            request_id = request,
            outcome = tracing::field::Empty
        )
        .entered();
        let delivery = self.coordinator.deliver(event);
        tracing::Span::current().record("outcome", tracing::field::debug(&delivery));
        tracing::trace!(event = kind.as_str(), ?delivery, "event delivered");
        self.stats.record(delivery);
    }

    fn abandon_queued(&mut self) {
        let mut abandoned = 0_u64;
        while let Ok(command) = self.receiver.try_recv() {
            if let Command::Deliver(event) = command {
                let delivery = self.coordinator.abandon(event);
                self.stats.record(delivery);
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::debug!(abandoned, "queued events abandoned after shutdown");
        }
    }
}

impl Drop for DeliveryLoop {
    fn drop(&mut self) {
        self.abandon_queued();
    }
}
