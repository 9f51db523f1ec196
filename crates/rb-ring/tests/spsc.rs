//! Thread-level SPSC tests.
//!
//! One producer and one consumer share a buffer and retry whenever the
//! fail-fast lock or the block policy turns them away.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use rb_core::{PropertyChecker, RingBufferProperties, RingBufferPropertyChecker};
use rb_ring::{
    HeapRingBuffer, OverflowPolicy, RingBuffer, RingBufferBuilder, RingBufferError,
    TrackedRingBuffer,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn test_block_policy_delivers_everything_in_order() {
    init_tracing();

    const MESSAGES: u64 = 5_000;
    let buffer = TrackedRingBuffer::new(OverflowPolicy::Block, 8).unwrap();
    let rejected = AtomicU64::new(0);

    thread::scope(|s| {
        s.spawn(|| {
            let mut next = 1;
            while next <= MESSAGES {
                match buffer.enqueue(next) {
                    Ok(()) => next += 1,
                    Err(
                        RingBufferError::LockAcquisitionFailed { .. }
                        | RingBufferError::ClobberAttempt { .. },
                    ) => {
                        rejected.fetch_add(1, Ordering::Relaxed);
                        thread::yield_now();
                    }
                    Err(other) => panic!("producer failed: {}", other),
                }
            }
        });

        s.spawn(|| {
            let mut received = 0;
            while received < MESSAGES {
                match buffer.dequeue() {
                    Ok(Some(_)) => received += 1,
                    Ok(None) | Err(RingBufferError::LockAcquisitionFailed { .. }) => {
                        thread::yield_now();
                    }
                    Err(other) => panic!("consumer failed: {}", other),
                }
            }
        });
    });

    let expected: Vec<u64> = (1..=MESSAGES).collect();
    assert_eq!(buffer.consumed_messages(), expected);
    assert!(buffer.is_empty());
    assert_eq!(buffer.rejected_count(), rejected.load(Ordering::Relaxed));

    let checker = RingBufferPropertyChecker::new(&buffer);
    for result in checker.check_all() {
        assert!(result.holds, "{}", result);
    }
}

#[test]
fn test_overwrite_producer_with_peeker() {
    init_tracing();

    let buffer = RingBufferBuilder::new()
        .with_policy(OverflowPolicy::Overwrite)
        .with_capacity(10)
        .build::<u64>()
        .unwrap();
    let done = AtomicBool::new(false);
    let peeked = AtomicU64::new(0);

    thread::scope(|s| {
        s.spawn(|| {
            let mut written = 0_u64;
            while written < 2_000 {
                if buffer.enqueue(written).is_ok() {
                    written += 1;
                }
                assert!(buffer.current_size() <= buffer.capacity());
            }
            done.store(true, Ordering::Release);
        });

        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                match buffer.peek() {
                    Ok(Some(_)) => {
                        peeked.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {}
                    Err(err) => assert!(err.is_retryable(), "{}", err),
                }
            }
        });
    });

    assert_eq!(buffer.current_size(), buffer.capacity());
    assert_eq!(buffer.snapshot().unwrap().len(), buffer.capacity());
    assert_eq!(buffer.dequeue().unwrap(), Some(1_990));
}

#[test]
fn test_overwrite_consumer_never_sees_duplicates() {
    init_tracing();

    let buffer = TrackedRingBuffer::new(OverflowPolicy::Overwrite, 4).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            let mut next = 1;
            while next <= 3_000 {
                if buffer.enqueue(next).is_ok() {
                    next += 1;
                }
            }
            done.store(true, Ordering::Release);
        });

        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                let _ = buffer.dequeue();
            }
        });
    });

    let checker = RingBufferPropertyChecker::new(&buffer);
    assert!(checker.all_hold(), "{:?}", checker.violations());
    assert!(buffer.reported_size() <= 4);
}

#[test]
fn test_clear_races_with_producer() {
    init_tracing();

    let buffer = TrackedRingBuffer::new(OverflowPolicy::Block, 16).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for id in 1..=1_000 {
                let _ = buffer.enqueue(id);
            }
        });

        s.spawn(|| {
            for _ in 0..200 {
                let _ = buffer.clear();
                thread::yield_now();
            }
        });
    });

    let checker = RingBufferPropertyChecker::new(&buffer);
    assert!(checker.all_hold(), "{:?}", checker.violations());
}

#[test]
fn test_buffers_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HeapRingBuffer<String>>();
    assert_send_sync::<TrackedRingBuffer>();
}
