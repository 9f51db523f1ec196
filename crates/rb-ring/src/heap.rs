//! On-heap SPSC ring buffer.
//!
//! # Layout
//!
//! A fixed slot array plus two cursors. Each cursor points at the slot it
//! touched last, so both pre-advance: the first write lands in slot 1 and
//! the first read looks at slot 1.
//!
//! ```text
//!  capacity = 4, after enqueue(a), enqueue(b), dequeue() -> a
//!
//!   slot:   0      1      2      3
//!         [ -  ] [ -  ] [ b  ] [ -  ]
//!                  ^      ^
//!                  r      w
//! ```
//!
//! # Locking
//!
//! One `RwLock` guards slots and cursors. Enqueue, dequeue and clear take
//! the write side, peek and snapshot the read side. Every acquisition is a
//! single `try_*` attempt; contention fails fast with
//! `LockAcquisitionFailed` and no mutation. The element count lives outside
//! the lock in an atomic so `current_size` never contends.
//!
//! # Invariants
//!
//! | Property | Verified By |
//! |----------|-------------|
//! | BoundedCapacity | unit, DST, stateright, kani |
//! | SizeMatchesContents | unit, DST, stateright, loom |
//! | NoClobberUnderBlock | unit, DST, stateright, kani |
//! | NoLostMessages | DST, stateright |

use std::fmt;

use tracing::{debug, warn};

use crate::builder::RingBufferBuilder;
use crate::error::{LockedOp, Result, RingBufferError};
use crate::policy::OverflowPolicy;
use crate::slot::Slot;
use crate::sync::{AtomicUsize, Ordering, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use crate::RingBuffer;

/// Fixed-capacity ring buffer for one producer and one consumer.
pub struct HeapRingBuffer<T> {
    policy: OverflowPolicy,
    capacity: usize,
    /// Occupied slots. Written only under the write lock.
    count: AtomicUsize,
    state: RwLock<RingState<T>>,
}

struct RingState<T> {
    slots: Box<[Slot<T>]>,
    /// Most recently written slot.
    write_cursor: usize,
    /// Most recently read slot.
    read_cursor: usize,
}

impl<T> RingState<T> {
    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) % self.slots.len()
    }

    /// Slot indices in read order, starting just after the read cursor.
    fn read_order(&self) -> impl Iterator<Item = usize> + '_ {
        let start = self.advance(self.read_cursor);
        (0..self.slots.len()).map(move |offset| (start + offset) % self.slots.len())
    }
}

impl<T> HeapRingBuffer<T> {
    /// Create an empty buffer.
    ///
    /// Fails with `InvalidCapacity` when `capacity` is zero.
    pub fn new(policy: OverflowPolicy, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RingBufferError::InvalidCapacity {
                requested: capacity,
            });
        }

        let slots: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::Empty).collect();
        debug!(%policy, capacity, "created ring buffer");

        Ok(Self {
            policy,
            capacity,
            count: AtomicUsize::new(0),
            state: RwLock::new(RingState {
                slots,
                write_cursor: 0,
                read_cursor: 0,
            }),
        })
    }

    #[must_use]
    pub fn builder() -> RingBufferBuilder {
        RingBufferBuilder::new()
    }

    fn write_guard(&self, op: LockedOp) -> Result<RwLockWriteGuard<'_, RingState<T>>> {
        match self.state.try_write() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => {
                warn!(%op, lock = op.lock_kind(), "failed to acquire ring buffer lock");
                Err(RingBufferError::LockAcquisitionFailed { op })
            }
            Err(TryLockError::Poisoned(_)) => Err(RingBufferError::unknown(format!(
                "ring buffer lock poisoned during {}",
                op
            ))),
        }
    }

    fn read_guard(&self, op: LockedOp) -> Result<RwLockReadGuard<'_, RingState<T>>> {
        match self.state.try_read() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => {
                warn!(%op, lock = op.lock_kind(), "failed to acquire ring buffer lock");
                Err(RingBufferError::LockAcquisitionFailed { op })
            }
            Err(TryLockError::Poisoned(_)) => Err(RingBufferError::unknown(format!(
                "ring buffer lock poisoned during {}",
                op
            ))),
        }
    }
}

impl<T> RingBuffer<T> for HeapRingBuffer<T> {
    fn enqueue_displacing(&self, element: T) -> Result<Option<T>> {
        let mut state = self.write_guard(LockedOp::Enqueue)?;

        let candidate = state.advance(state.write_cursor);
        if !self.policy.permits_clobber() && state.slots[candidate].is_occupied() {
            warn!(slot = candidate, policy = %self.policy, "rejected enqueue over unread element");
            return Err(RingBufferError::ClobberAttempt { slot: candidate });
        }

        state.write_cursor = candidate;
        let displaced = state.slots[candidate].replace(element);

        // A displaced element leaves occupancy unchanged.
        if displaced.is_none() {
            let count = self.count.load(Ordering::Relaxed);
            if count < self.capacity {
                self.count.store(count + 1, Ordering::Release);
            }
        }

        Ok(displaced)
    }

    fn dequeue(&self) -> Result<Option<T>> {
        let mut state = self.write_guard(LockedOp::Dequeue)?;

        let candidate = state.advance(state.read_cursor);
        let Some(element) = state.slots[candidate].take() else {
            return Ok(None);
        };
        state.read_cursor = candidate;

        let count = self.count.load(Ordering::Relaxed);
        if count > 0 {
            self.count.store(count - 1, Ordering::Release);
        }

        Ok(Some(element))
    }

    fn peek(&self) -> Result<Option<T>>
    where
        T: Clone,
    {
        let state = self.read_guard(LockedOp::Peek)?;
        let candidate = state.advance(state.read_cursor);
        Ok(state.slots[candidate].as_ref().cloned())
    }

    fn clear_draining(&self) -> Result<Vec<T>> {
        let mut state = self.write_guard(LockedOp::Clear)?;

        let order: Vec<usize> = state.read_order().collect();
        let drained: Vec<T> = order
            .into_iter()
            .filter_map(|index| state.slots[index].take())
            .collect();
        self.count.store(0, Ordering::Release);
        drop(state);

        debug!(cleared = drained.len(), "cleared ring buffer");
        Ok(drained)
    }

    fn snapshot(&self) -> Result<Vec<T>>
    where
        T: Clone,
    {
        let state = self.read_guard(LockedOp::Snapshot)?;
        Ok(state
            .read_order()
            .filter_map(|index| state.slots[index].as_ref().cloned())
            .collect())
    }

    fn current_size(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<T: fmt::Debug> fmt::Debug for HeapRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("HeapRingBuffer");
        out.field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .field("size", &self.current_size());

        match self.state.try_read() {
            Ok(state) => {
                let slots: Vec<Option<&T>> = state.slots.iter().map(Slot::as_ref).collect();
                out.field("write_cursor", &state.write_cursor)
                    .field("read_cursor", &state.read_cursor)
                    .field("slots", &slots)
                    .finish()
            }
            Err(TryLockError::WouldBlock) => out.field("slots", &format_args!("<locked>")).finish(),
            Err(TryLockError::Poisoned(_)) => {
                out.field("slots", &format_args!("<poisoned>")).finish()
            }
        }
    }
}
