//! DST integration tests for the ring buffers.
//!
//! Runs `HeapRingBuffer` and `TrackedRingBuffer` through the DST harness
//! with fault injection under both overflow policies, and verifies the
//! invariants from rb-core after every run.
//!
//! Reproduce a failure with `DST_SEED=<seed> cargo test -p rb-dst`.

use rb_dst::{
    get_or_generate_seed, random_operations, run_dst_scenario, DeterministicRng, DstConfig,
    DstResult, FaultConfig,
};
use rb_ring::{HeapRingBuffer, OverflowPolicy, TrackedRingBuffer};
use rb_stateright::{RingAction, VerifiableRing};

fn base_config() -> DstConfig {
    DstConfig::from_env().unwrap_or_else(|err| {
        println!("{}; using a fresh seed", err);
        DstConfig {
            seed: get_or_generate_seed(),
            ..DstConfig::default()
        }
    })
}

fn run_random<R: VerifiableRing>(config: &DstConfig) -> DstResult {
    let ops = random_operations(&mut DeterministicRng::new(config.seed), config.iterations);
    run_dst_scenario::<R>(config, ops).unwrap()
}

#[test]
fn test_heap_ring_under_faults() {
    let base = base_config().with_faults(FaultConfig::aggressive());

    for policy in OverflowPolicy::ALL {
        let config = base.with_policy(policy);
        let result = run_random::<HeapRingBuffer<u64>>(&config);
        println!("{}", result.format());
        assert!(result.passed, "DST failed: {}", result.format());
    }
}

#[test]
fn test_tracked_ring_under_faults() {
    let base = base_config().with_faults(FaultConfig::aggressive());

    for policy in OverflowPolicy::ALL {
        let config = base.with_policy(policy);
        let result = run_random::<TrackedRingBuffer>(&config);
        assert!(result.passed, "DST failed: {}", result.format());
    }
}

#[test]
fn test_capacity_sweep() {
    let seed = get_or_generate_seed();

    for capacity in 1..=6 {
        for policy in OverflowPolicy::ALL {
            let config = DstConfig {
                seed,
                iterations: 300,
                ..DstConfig::default()
            }
            .with_policy(policy)
            .with_capacity(capacity);

            let result = run_random::<HeapRingBuffer<u64>>(&config);
            assert!(result.passed, "capacity {}: {}", capacity, result.format());
        }
    }
}

#[test]
fn test_many_seeds() {
    let base_seed = get_or_generate_seed();

    for i in 0..25 {
        let config = DstConfig {
            seed: base_seed.wrapping_add(i).max(1),
            iterations: 200,
            faults: FaultConfig::aggressive(),
            ..DstConfig::default()
        }
        .with_capacity(3);

        for policy in OverflowPolicy::ALL {
            let result = run_random::<HeapRingBuffer<u64>>(&config.with_policy(policy));
            assert!(result.passed, "{}", result.format());
        }
    }
}

#[test]
fn test_fault_free_run_injects_nothing() {
    let config = base_config().with_faults(FaultConfig::none());
    let result = run_random::<HeapRingBuffer<u64>>(&config);

    assert!(result.passed, "{}", result.format());
    assert!(result.fault_errors.is_empty());
    assert_eq!(result.stats.faults_injected, 0);
    assert_eq!(result.stats.operations_count, config.iterations as u64);
}

#[test]
fn test_producer_only_workload() {
    let ops: Vec<RingAction> = (1..=10).map(RingAction::Enqueue).collect();

    let block = DstConfig::default()
        .with_policy(OverflowPolicy::Block)
        .with_faults(FaultConfig::none());
    let result = run_dst_scenario::<HeapRingBuffer<u64>>(&block, ops.clone()).unwrap();
    assert!(result.passed, "{}", result.format());
    assert_eq!(result.stats.produced, 4);
    assert_eq!(result.stats.rejected_enqueues, 6);
    assert_eq!(result.stats.overwritten, 0);

    let overwrite = block.with_policy(OverflowPolicy::Overwrite);
    let result = run_dst_scenario::<HeapRingBuffer<u64>>(&overwrite, ops).unwrap();
    assert!(result.passed, "{}", result.format());
    assert_eq!(result.stats.produced, 10);
    assert_eq!(result.stats.rejected_enqueues, 0);
    assert_eq!(result.stats.overwritten, 6);
}

#[test]
fn test_same_seed_replays_identically() {
    let config = base_config()
        .with_policy(OverflowPolicy::Block)
        .with_faults(FaultConfig::aggressive());

    let first = run_random::<TrackedRingBuffer>(&config);
    let second = run_random::<TrackedRingBuffer>(&config);

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.fault_errors, second.fault_errors);
}
