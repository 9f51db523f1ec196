//! Integration test: stateright discoveries replayed against real buffers.
//!
//! 1. Model check each policy exhaustively for small capacities
//! 2. Take the shortest path to each interesting state the checker found
//! 3. Replay it on `HeapRingBuffer` and `TrackedRingBuffer`, comparing every step

use rb_core::{PropertyChecker, RingBufferPropertyChecker};
use rb_ring::{HeapRingBuffer, OverflowPolicy, RingBuffer, TrackedRingBuffer};
use rb_stateright::{check_model, replay_actions, RingAction, RingModel};
use stateright::{Checker, Model};

fn discovered_path(model: RingModel, property: &'static str) -> Vec<RingAction> {
    let checker = model.checker().spawn_bfs().join();
    checker
        .discovery(property)
        .unwrap_or_else(|| panic!("checker never reached `{}`", property))
        .into_actions()
}

#[test]
fn test_every_configuration_model_checks() {
    for policy in OverflowPolicy::ALL {
        for capacity in 1..=3 {
            let summary = check_model(policy, capacity, 4);
            assert!(summary.passed(), "{}", summary.format());
        }
    }
}

#[test]
fn test_clobber_rejection_path_replays() {
    let actions = discovered_path(RingModel::new(OverflowPolicy::Block, 3, 5), "clobber rejected");
    assert!(actions.iter().any(|a| matches!(a, RingAction::Enqueue(_))));

    let ring = HeapRingBuffer::new(OverflowPolicy::Block, 3).unwrap();
    let model = replay_actions(&ring, actions).unwrap();
    assert!(model.saw_rejection);
    assert!(ring.is_full());
}

#[test]
fn test_overwrite_path_replays() {
    let actions = discovered_path(
        RingModel::new(OverflowPolicy::Overwrite, 2, 5),
        "message overwritten",
    );

    let ring = HeapRingBuffer::new(OverflowPolicy::Overwrite, 2).unwrap();
    let model = replay_actions(&ring, actions).unwrap();
    assert!(!model.overwritten.is_empty());
}

#[test]
fn test_discovered_paths_keep_invariants() {
    for (policy, property) in [
        (OverflowPolicy::Overwrite, "message overwritten"),
        (OverflowPolicy::Overwrite, "buffer saturated"),
        (OverflowPolicy::Block, "clobber rejected"),
        (OverflowPolicy::Block, "buffer saturated"),
    ] {
        let actions = discovered_path(RingModel::new(policy, 2, 5), property);

        let ring = TrackedRingBuffer::new(policy, 2).unwrap();
        replay_actions(&ring, actions).unwrap();

        let checker = RingBufferPropertyChecker::new(&ring);
        for result in checker.check_all() {
            assert!(result.holds, "{} after `{}`: {}", policy, property, result);
        }
    }
}
