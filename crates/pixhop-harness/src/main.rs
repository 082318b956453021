#![forbid(unsafe_code)]

//! pixhop reference application
//!
//! Simulates an image grid: worker threads "download" and "decode" images
//! with progress ticks while the main thread runs the delivery loop. Some
//! targets are recycled mid-flight and some requests are canceled, so every
//! delivery path is exercised.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug PIXHOP_LOG_DROPS=1 cargo run -p pixhop-harness --bin pixhop-demo -- 24
//! ```
//!
//! The optional argument is the number of images (default 16).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pixhop_core::{Artifact, DisplayListener, FailureCause, ImageFrom, Request, TargetId, Targets};
use pixhop_runtime::{DeliveryConfig, Dispatcher, delivery_channel};
use tracing_subscriber::EnvFilter;

const DEFAULT_JOBS: usize = 16;
const WORKERS: usize = 4;
const PROGRESS_STEPS: u64 = 4;
const BASE_SIDE: usize = 8;
const MAX_SIDE: usize = 1024;

/// Listener that logs every callback.
struct LogListener {
    slot: usize,
}

impl DisplayListener for LogListener {
    fn on_started(&self) {
        tracing::info!(slot = self.slot, "started");
    }

    fn on_completed(&self, uri: &str, _target: TargetId, artifact: &Artifact, from: ImageFrom) {
        tracing::info!(
            slot = self.slot,
            uri,
            bytes = artifact.byte_len(),
            from = from.as_str(),
            "completed"
        );
    }

    fn on_failed(&self, cause: &FailureCause) {
        tracing::info!(slot = self.slot, %cause, "failed");
    }

    fn on_canceled(&self) {
        tracing::info!(slot = self.slot, "canceled");
    }

    fn on_progress(&self, completed: u64, total: u64) {
        tracing::debug!(slot = self.slot, completed, total, "progress");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

/// Side length and RGBA buffer size of the fake image decoded for `slot`.
///
/// `None` once the image would be larger than `MAX_SIDE` on a side.
fn decoded_size(slot: usize) -> Option<(u32, usize)> {
    let side = BASE_SIDE.checked_add(slot).filter(|side| *side <= MAX_SIDE)?;
    let len = side.checked_mul(side)?.checked_mul(4)?;
    Some((u32::try_from(side).ok()?, len))
}

/// Worker body: fake a fetch with progress, then emit the outcome.
fn load(slot: usize, request: &Arc<Request>, targets: &Targets, dispatcher: &Dispatcher) {
    let total = 1024_u64.saturating_mul(u64::try_from(slot).unwrap_or(u64::MAX).saturating_add(1));
    for step in 1..=PROGRESS_STEPS {
        if request.is_canceled() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
        dispatcher.emit_progress(request.clone(), total * step / PROGRESS_STEPS, total);
    }

    match slot % 5 {
        // the view got recycled for another image while we were loading
        3 => {
            targets.assign(request.target(), pixhop_core::RequestId::next());
        }
        // user scrolled away; request canceled after the decode finished
        4 if slot % 2 == 0 => {
            request.cancel();
        }
        _ => {}
    }

    if slot % 4 == 1 {
        request.fail(FailureCause::DownloadFailed(format!("HTTP 404 for slot {slot}")));
        dispatcher.emit_failed(request.clone());
        return;
    }
    match decoded_size(slot) {
        Some((side, len)) => {
            let pixels = vec![0u8; len];
            request.complete(Artifact::new(request.uri(), side, side, pixels), ImageFrom::Network);
            dispatcher.emit_completed(request.clone());
        }
        None => {
            request.fail(FailureCause::DecodeFailed(format!("image too large for slot {slot}")));
            dispatcher.emit_failed(request.clone());
        }
    }
}

fn main() {
    init_tracing();

    let jobs = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DEFAULT_JOBS);

    let config = DeliveryConfig::from_env();
    let targets = Targets::new();
    let (dispatcher, mut delivery) = delivery_channel(&config, targets.clone());

    // One memory-cache hit, shown right away on the presentation thread.
    let cached_target = targets.insert();
    let cached = LogListener { slot: usize::MAX };
    delivery.coordinator().fire_started(Some(&cached));
    delivery.coordinator().fire_completed(
        cached_target,
        "mem://avatar.png",
        &Artifact::new("mem://avatar.png", 4, 4, vec![0; 64]),
        Some(&cached),
        ImageFrom::MemoryCache,
    );

    let mut requests = Vec::with_capacity(jobs);
    for slot in 0..jobs {
        let target = targets.insert();
        let listener: Arc<dyn DisplayListener> = Arc::new(LogListener { slot });
        let request = Request::builder(format!("https://img.example/{slot}.png"), target)
            .name(format!("slot-{slot}"))
            .listener(listener.clone())
            .failure_placeholder(Artifact::placeholder("broken-image"))
            .build();
        targets.assign(target, request.id());
        delivery.coordinator().fire_started(Some(&*listener));
        requests.push((slot, request));
    }

    // Requests canceled before any work started only need `on_canceled`.
    let early: Arc<dyn DisplayListener> = Arc::new(LogListener { slot: jobs });
    dispatcher.emit_canceled(Some(early));

    let mut workers = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let batch: Vec<_> = requests
            .iter()
            .filter(|(slot, _)| slot % WORKERS == worker)
            .cloned()
            .collect();
        let dispatcher = dispatcher.clone();
        let targets = targets.clone();
        let spawned = thread::Builder::new()
            .name(format!("pixhop-worker-{worker}"))
            .spawn(move || {
                for (slot, request) in &batch {
                    load(*slot, request, &targets, &dispatcher);
                }
            });
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(err) => tracing::error!(worker, %err, "failed to spawn worker"),
        }
    }
    drop(dispatcher);

    let stats = delivery.run();
    for handle in workers {
        let _ = handle.join();
    }

    println!(
        "delivered: {} completed, {} failed, {} canceled, {} progress",
        stats.completed, stats.failed, stats.canceled, stats.progress,
    );
    println!(
        "dropped: {} target gone, {} canceled, {} at shutdown; skipped: {}",
        stats.dropped_target_gone, stats.dropped_canceled, stats.dropped_shut_down, stats.skipped,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_size_grows_with_slot() {
        assert_eq!(decoded_size(0), Some((8, 8 * 8 * 4)));
        assert_eq!(decoded_size(24), Some((32, 32 * 32 * 4)));
    }

    #[test]
    fn decoded_size_refuses_oversized_slots() {
        assert_eq!(decoded_size(MAX_SIDE - BASE_SIDE), Some((1024, 1024 * 1024 * 4)));
        assert_eq!(decoded_size(MAX_SIDE - BASE_SIDE + 1), None);
        assert_eq!(decoded_size(100_000), None);
        assert_eq!(decoded_size(usize::MAX), None);
    }
}
