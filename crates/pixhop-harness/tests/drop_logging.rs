#![forbid(unsafe_code)]

//! Drop diagnostics through `tracing`.
//!
//! A delivery loop configured with `log_drops` reports every dropped
//! delivery as a warning carrying `event`, `reason` and `request` fields.
//! Without it the loop stays quiet at warn level.

use std::sync::Arc;

use pixhop_core::{
    Artifact, DisplayListener, FailureCause, ImageFrom, Request, RequestId, Targets,
};
use pixhop_harness::{CapturedEvent, RecordingListener, with_captured_events};
use pixhop_runtime::{DeliveryConfig, ENV_LOG_DROPS, delivery_channel};

fn warnings(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect()
}

/// One stale completion and one canceled failure, delivered under `config`.
fn deliver_two_drops(config: &DeliveryConfig) -> Vec<CapturedEvent> {
    let ((), events) = with_captured_events(|| {
        let targets = Targets::new();
        let (dispatcher, mut delivery) = delivery_channel(config, targets.clone());
        let listener: Arc<dyn DisplayListener> = Arc::new(RecordingListener::new());

        let recycled = targets.insert();
        let stale = Request::builder("https://img/stale.png", recycled)
            .name("stale")
            .listener(listener.clone())
            .build();
        targets.assign(recycled, stale.id());
        stale.complete(Artifact::new("stale", 1, 1, vec![0; 4]), ImageFrom::Network);
        dispatcher.emit_completed(stale.clone());
        targets.assign(recycled, RequestId::next());

        let target = targets.insert();
        let canceled = Request::builder("https://img/gone.png", target)
            .name("gone")
            .listener(listener)
            .build();
        targets.assign(target, canceled.id());
        canceled.fail(FailureCause::DownloadFailed("reset".into()));
        dispatcher.emit_failed(canceled.clone());
        canceled.cancel();

        assert_eq!(delivery.pump(), 2);
    });
    events
}

#[test]
fn log_drops_reports_each_drop_as_warning() {
    let config = DeliveryConfig::default().with_log_drops(true);
    let events = deliver_two_drops(&config);
    let warned = warnings(&events);

    assert_eq!(warned.len(), 2, "{warned:#?}");
    assert_eq!(warned[0].field("event"), Some("completed"));
    assert_eq!(warned[0].field("reason"), Some("target_gone"));
    assert_eq!(warned[0].field("request"), Some("stale"));
    assert_eq!(warned[1].field("event"), Some("failed"));
    assert_eq!(warned[1].field("reason"), Some("request_canceled"));
    assert_eq!(warned[1].field("request"), Some("gone"));
    assert!(
        warned[0]
            .message()
            .is_some_and(|m| m.contains("target is gone or reassigned"))
    );
}

#[test]
fn released_artifact_is_logged_at_debug() {
    let config = DeliveryConfig::default().with_log_drops(true);
    let events = deliver_two_drops(&config);

    let released: Vec<_> = events
        .iter()
        .filter(|e| e.message() == Some("artifact released"))
        .collect();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].level, tracing::Level::DEBUG);
    assert_eq!(released[0].field("request"), Some("stale"));
    assert_eq!(
        released[0].field("context"),
        Some("completed callback - cancel")
    );
}

#[test]
fn drops_are_quiet_by_default() {
    let events = deliver_two_drops(&DeliveryConfig::default());
    assert!(warnings(&events).is_empty());
}

#[test]
fn env_switch_enables_drop_logging() {
    let config =
        DeliveryConfig::from_env_with(|key| (key == ENV_LOG_DROPS).then(|| "on".to_string()));
    let events = deliver_two_drops(&config);
    assert_eq!(warnings(&events).len(), 2);
}

#[test]
fn malformed_completion_is_an_error() {
    let ((), events) = with_captured_events(|| {
        let targets = Targets::new();
        let config = DeliveryConfig::default();
        let (dispatcher, mut delivery) = delivery_channel(&config, targets.clone());
        let target = targets.insert();
        let request = Request::builder("https://img/empty.png", target).build();
        targets.assign(target, request.id());
        // emitted without attaching an artifact first
        dispatcher.emit_completed(request);
        delivery.pump();
    });

    assert!(events.iter().any(|e| {
        e.level == tracing::Level::ERROR
            && e.message() == Some("completed event without an artifact outcome")
    }));
}
