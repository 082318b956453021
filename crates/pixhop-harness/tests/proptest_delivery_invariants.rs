//! Property-based invariant tests for event delivery.
//!
//! Random interleavings of worker emits, cancellations, target recycling
//! and pumps are replayed against a [`Scene`]. Whatever the interleaving:
//!
//! 1. A listener sees at most one terminal callback per request.
//! 2. No progress callback follows a terminal callback.
//! 3. Delivered progress is an in-order subsequence of what was emitted.
//! 4. A completed request whose completion was not delivered holds no artifact.
//! 5. An undisturbed request that finished gets exactly one terminal callback.
//! 6. `on_completed` fires only for targets the request still owned.

use std::sync::Arc;

use pixhop_core::{Artifact, FailureCause, ImageFrom, Request, Status};
use pixhop_harness::{ListenerCall, RecordingListener, Scene};
use proptest::prelude::*;

const REQUESTS: usize = 4;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Progress(usize, u64, u64),
    Finish(usize, bool),
    Cancel(usize),
    Reassign(usize),
    RemoveTarget(usize),
    Pump,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..REQUESTS, 0u64..=200, 0u64..=200).prop_map(|(i, c, t)| Op::Progress(i, c, t)),
        3 => (0..REQUESTS, any::<bool>()).prop_map(|(i, ok)| Op::Finish(i, ok)),
        1 => (0..REQUESTS).prop_map(Op::Cancel),
        1 => (0..REQUESTS).prop_map(Op::Reassign),
        1 => (0..REQUESTS).prop_map(Op::RemoveTarget),
        2 => Just(Op::Pump),
    ]
}

#[derive(Default)]
struct Track {
    progress_emitted: Vec<(u64, u64)>,
    finished: Option<bool>,
    disturbed: bool,
    /// Set when the target was taken away before the completion was pumped.
    lost_target_before_delivery: bool,
}

struct Run {
    scene: Scene,
    slots: Vec<(Arc<Request>, Arc<RecordingListener>, Track)>,
}

impl Run {
    fn new() -> Self {
        let scene = Scene::new();
        let slots = (0..REQUESTS)
            .map(|i| {
                let listener = Arc::new(RecordingListener::new());
                let request = scene.bind(&format!("https://img/{i}.png"), listener.clone());
                (request, listener, Track::default())
            })
            .collect();
        Self { scene, slots }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Progress(i, completed, total) => {
                let (request, _, track) = &mut self.slots[i];
                track.progress_emitted.push((completed, total));
                self.scene
                    .dispatcher
                    .emit_progress(request.clone(), completed, total);
            }
            Op::Finish(i, ok) => {
                let (request, _, track) = &mut self.slots[i];
                // a worker finishes a request once
                if track.finished.is_some() {
                    return;
                }
                track.finished = Some(ok);
                if ok {
                    let pixels = Artifact::new(request.uri(), 1, 1, vec![0; 16]);
                    request.complete(pixels, ImageFrom::Network);
                    self.scene.dispatcher.emit_completed(request.clone());
                } else {
                    request.fail(FailureCause::DecodeFailed("truncated".into()));
                    self.scene.dispatcher.emit_failed(request.clone());
                }
            }
            Op::Cancel(i) => {
                let (request, _, track) = &mut self.slots[i];
                track.disturbed = true;
                request.cancel();
            }
            Op::Reassign(i) => {
                let (request, _, track) = &mut self.slots[i];
                track.disturbed = true;
                if !request.is_finished() {
                    track.lost_target_before_delivery = true;
                }
                self.scene.reassign(request.target());
            }
            Op::RemoveTarget(i) => {
                let (request, _, track) = &mut self.slots[i];
                track.disturbed = true;
                if !request.is_finished() {
                    track.lost_target_before_delivery = true;
                }
                self.scene.remove_target(request.target());
            }
            Op::Pump => {
                self.scene.pump();
            }
        }
    }
}

fn run(ops: &[Op]) -> Run {
    let mut run = Run::new();
    for op in ops {
        run.apply(op);
    }
    run.scene.pump();
    run
}

// ═════════════════════════════════════════════════════════════════════════
// 1. At most one terminal callback
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn at_most_one_terminal_callback(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (request, listener, _) in &run.slots {
            prop_assert!(
                listener.terminal_count() <= 1,
                "{} got {:?}",
                request.uri(),
                listener.calls()
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. No progress after terminal
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn no_progress_after_terminal(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (_, listener, _) in &run.slots {
            let calls = listener.calls();
            if let Some(end) = calls.iter().position(ListenerCall::is_terminal) {
                prop_assert!(
                    !calls[end..].iter().any(|c| matches!(c, ListenerCall::Progress { .. })),
                    "progress after terminal: {:?}",
                    calls
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Progress is FIFO and verbatim
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn progress_is_in_order_subsequence(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (_, listener, track) in &run.slots {
            let delivered: Vec<(u64, u64)> = listener
                .calls()
                .into_iter()
                .filter_map(|c| match c {
                    ListenerCall::Progress { completed, total } => Some((completed, total)),
                    _ => None,
                })
                .collect();
            let mut emitted = track.progress_emitted.iter();
            for tick in &delivered {
                prop_assert!(
                    emitted.any(|e| e == tick),
                    "{:?} is not a subsequence of {:?}",
                    delivered,
                    track.progress_emitted
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Undelivered completions release their artifact
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dropped_completion_releases_artifact(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (request, _, track) in &run.slots {
            if track.finished == Some(true) && request.status() != Status::Completed {
                prop_assert!(request.artifact().is_none(), "{} leaked", request.uri());
                prop_assert_eq!(request.status(), Status::Canceled);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Undisturbed requests finish exactly once
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undisturbed_requests_finish_once(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (request, listener, track) in &run.slots {
            let Some(ok) = track.finished else { continue };
            if track.disturbed {
                continue;
            }
            prop_assert_eq!(listener.terminal_count(), 1);
            let expected = if ok { Status::Completed } else { Status::Failed };
            prop_assert_eq!(request.status(), expected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Completion requires ownership at delivery time
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn completion_requires_ownership(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let run = run(&ops);
        for (request, listener, track) in &run.slots {
            let completed = listener
                .calls()
                .iter()
                .any(|c| matches!(c, ListenerCall::Completed { .. }));
            if track.lost_target_before_delivery {
                prop_assert!(!completed, "{} completed on a lost target", request.uri());
            }
            if completed {
                let applied = run.scene.displayer.applied();
                prop_assert!(applied.iter().any(|a| a.request == request.id()));
            }
        }
    }
}
