#![forbid(unsafe_code)]

//! A dedicated presentation thread.
//!
//! For hosts without their own UI loop, [`PresentationThread::spawn`] runs a
//! [`DeliveryLoop`](crate::DeliveryLoop) on a named background thread. The
//! thread exits once [`PresentationThread::shutdown`] is called (after
//! delivering everything queued before it) or once every dispatcher clone
//! has been dropped.

use std::io;
use std::thread::{self, JoinHandle};

use pixhop_core::Targets;

use crate::config::DeliveryConfig;
use crate::delivery_loop::{DeliveryStats, delivery_channel};
use crate::dispatcher::Dispatcher;

/// Handle to a running presentation thread.
#[derive(Debug)]
pub struct PresentationThread {
    control: Dispatcher,
    handle: Option<JoinHandle<DeliveryStats>>,
}

impl PresentationThread {
    /// Spawn the thread and return a dispatcher feeding it.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(config: DeliveryConfig, targets: Targets) -> io::Result<(Dispatcher, Self)> {
        let (dispatcher, mut delivery) = delivery_channel(&config, targets);
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || delivery.run())?;
        tracing::debug!(thread = %config.thread_name, "presentation thread spawned");
        Ok((
            dispatcher.clone(),
            Self {
                control: dispatcher,
                handle: Some(handle),
            },
        ))
    }

    /// Deliver everything already queued, stop the thread and join it.
    ///
    /// Returns the loop's final counters, or `None` if the thread panicked
    /// (e.g. a listener callback panicked).
    pub fn shutdown(mut self) -> Option<DeliveryStats> {
        self.stop()
    }

    fn stop(&mut self) -> Option<DeliveryStats> {
        self.control.shutdown();
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                tracing::error!("presentation thread panicked");
                None
            }
        }
    }
}

impl Drop for PresentationThread {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
