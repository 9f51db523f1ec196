//! History-recording wrapper for invariant checks.
//!
//! `TrackedRingBuffer` forwards every operation to a [`HeapRingBuffer<u64>`]
//! and records what succeeded, so `rb_core::RingBufferPropertyChecker` can
//! account for every message. History is recorded after the inner operation
//! returns; checks are meaningful once the buffer is quiescent.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rb_core::RingBufferProperties;

use crate::error::Result;
use crate::heap::HeapRingBuffer;
use crate::policy::OverflowPolicy;
use crate::RingBuffer;

/// Ring buffer of `u64` message ids with recorded history.
pub struct TrackedRingBuffer {
    inner: HeapRingBuffer<u64>,
    tracker: Mutex<RingTracker>,
}

#[derive(Debug, Default)]
struct RingTracker {
    produced: Vec<u64>,
    consumed: Vec<u64>,
    overwritten: Vec<u64>,
    cleared: Vec<u64>,
    rejected: u64,
}

impl TrackedRingBuffer {
    pub fn new(policy: OverflowPolicy, capacity: usize) -> Result<Self> {
        Ok(Self::wrap(HeapRingBuffer::new(policy, capacity)?))
    }

    /// Track an empty buffer. Elements already present would be unaccounted.
    #[must_use]
    pub fn wrap(inner: HeapRingBuffer<u64>) -> Self {
        debug_assert!(inner.is_empty(), "tracked buffer must start empty");
        Self {
            inner,
            tracker: Mutex::new(RingTracker::default()),
        }
    }

    /// Enqueues refused because of overflow or contention.
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.tracker().rejected
    }

    #[must_use]
    pub fn inner(&self) -> &HeapRingBuffer<u64> {
        &self.inner
    }

    fn tracker(&self) -> MutexGuard<'_, RingTracker> {
        // Each update is a single push, so a poisoned tracker is still whole.
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RingBuffer<u64> for TrackedRingBuffer {
    fn enqueue_displacing(&self, element: u64) -> Result<Option<u64>> {
        match self.inner.enqueue_displacing(element) {
            Ok(displaced) => {
                let mut tracker = self.tracker();
                tracker.produced.push(element);
                tracker.overwritten.extend(displaced);
                Ok(displaced)
            }
            Err(err) => {
                self.tracker().rejected += 1;
                Err(err)
            }
        }
    }

    fn dequeue(&self) -> Result<Option<u64>> {
        let dequeued = self.inner.dequeue()?;
        if let Some(element) = dequeued {
            self.tracker().consumed.push(element);
        }
        Ok(dequeued)
    }

    fn peek(&self) -> Result<Option<u64>> {
        self.inner.peek()
    }

    fn clear_draining(&self) -> Result<Vec<u64>> {
        let drained = self.inner.clear_draining()?;
        self.tracker().cleared.extend_from_slice(&drained);
        Ok(drained)
    }

    fn snapshot(&self) -> Result<Vec<u64>> {
        self.inner.snapshot()
    }

    fn current_size(&self) -> usize {
        self.inner.current_size()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn policy(&self) -> OverflowPolicy {
        self.inner.policy()
    }
}

impl RingBufferProperties for TrackedRingBuffer {
    fn produced_messages(&self) -> Vec<u64> {
        self.tracker().produced.clone()
    }

    fn consumed_messages(&self) -> Vec<u64> {
        self.tracker().consumed.clone()
    }

    fn overwritten_messages(&self) -> Vec<u64> {
        self.tracker().overwritten.clone()
    }

    fn cleared_messages(&self) -> Vec<u64> {
        self.tracker().cleared.clone()
    }

    /// Empty if a writer currently holds the lock.
    fn current_contents(&self) -> Vec<u64> {
        self.inner.snapshot().unwrap_or_default()
    }

    fn reported_size(&self) -> u64 {
        self.inner.current_size() as u64
    }

    fn max_capacity(&self) -> u64 {
        self.inner.capacity() as u64
    }

    fn permits_overwrite(&self) -> bool {
        self.inner.policy().permits_clobber()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use rb_core::{PropertyChecker, RingBufferPropertyChecker};

    #[test]
    fn test_invariants_hold_through_overwrite() {
        let buffer = TrackedRingBuffer::new(OverflowPolicy::Overwrite, 3).unwrap();
        for id in 1..=6 {
            buffer.enqueue(id).unwrap();
        }
        assert_eq!(buffer.dequeue().unwrap(), Some(4));

        assert_eq!(buffer.overwritten_messages(), vec![1, 2, 3]);
        assert_eq!(buffer.current_contents(), vec![5, 6]);

        let checker = RingBufferPropertyChecker::new(&buffer);
        assert!(checker.all_hold(), "{:?}", checker.violations());
    }

    #[test]
    fn test_block_records_rejections() {
        let buffer = TrackedRingBuffer::new(OverflowPolicy::Block, 2).unwrap();
        buffer.enqueue(1).unwrap();
        buffer.enqueue(2).unwrap();
        assert!(buffer.enqueue(3).is_err());
        assert_eq!(buffer.rejected_count(), 1);
        assert_eq!(buffer.produced_messages(), vec![1, 2]);
        // the refused message never reached the wrapped buffer
        assert_eq!(buffer.inner().snapshot().unwrap(), vec![1, 2]);
        assert!(buffer.inner().is_full());

        assert_eq!(buffer.dequeue().unwrap(), Some(1));
        buffer.clear().unwrap();
        assert_eq!(buffer.cleared_messages(), vec![2]);

        let checker = RingBufferPropertyChecker::new(&buffer);
        assert!(checker.all_hold(), "{:?}", checker.violations());
    }

    #[test]
    fn test_fifo_holds_without_overflow() {
        let buffer = TrackedRingBuffer::new(OverflowPolicy::Block, 4).unwrap();
        for round in 0..10_u64 {
            for i in 0..3 {
                buffer.enqueue(round * 10 + i).unwrap();
            }
            while buffer.dequeue().unwrap().is_some() {}
        }
        assert_eq!(buffer.consumed_messages(), buffer.produced_messages());

        let checker = RingBufferPropertyChecker::new(&buffer);
        assert!(checker.all_hold(), "{:?}", checker.violations());
    }
}
