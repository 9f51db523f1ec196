//! # rb-ring
//!
//! Fixed-capacity ring buffer for single-producer/single-consumer hand-off.
//!
//! Mutations take a write lock with a single non-blocking attempt and fail
//! fast under contention; peek takes the read side of the same lock. When the
//! producer catches up with unread data, the [`OverflowPolicy`] decides
//! whether the oldest element is overwritten or the enqueue is rejected.
//!
//! # Modules
//!
//! - `heap`: [`HeapRingBuffer`], the slot-array implementation
//! - `policy`: [`OverflowPolicy`]
//! - `error`: [`RingBufferError`] and the [`ErrorCode`] catalogue
//! - `builder`: [`RingBufferBuilder`]
//! - `tracked`: [`TrackedRingBuffer`], which records history for invariant checks
//! - `kani_proofs`: bounded proofs (under `#[cfg(kani)]`)
//!
//! Loom tests live next to the implementation and run with
//! `RUSTFLAGS="--cfg loom" cargo test -p rb-ring --release`.

pub mod builder;
pub mod error;
pub mod heap;
pub mod kani_proofs;
pub mod policy;
pub mod tracked;

mod slot;
mod sync;

pub use builder::RingBufferBuilder;
pub use error::{ErrorCode, LockedOp, Result, RingBufferError};
pub use heap::HeapRingBuffer;
pub use policy::{OverflowPolicy, ParsePolicyError};
pub use tracked::TrackedRingBuffer;

/// Operations shared by ring buffer implementations.
///
/// Every fallible operation either fully succeeds or leaves the buffer
/// unchanged.
pub trait RingBuffer<T> {
    /// Store `element`, returning any unread element it overwrote.
    fn enqueue_displacing(&self, element: T) -> Result<Option<T>>;

    fn enqueue(&self, element: T) -> Result<()> {
        self.enqueue_displacing(element).map(|_| ())
    }

    /// Remove the next element, or `None` if the next slot is empty.
    fn dequeue(&self) -> Result<Option<T>>;

    /// Clone the next element without removing it.
    fn peek(&self) -> Result<Option<T>>
    where
        T: Clone;

    /// Empty every slot, returning the removed elements in read order.
    fn clear_draining(&self) -> Result<Vec<T>>;

    fn clear(&self) -> Result<()> {
        self.clear_draining().map(|_| ())
    }

    /// Occupied elements in read order.
    fn snapshot(&self) -> Result<Vec<T>>
    where
        T: Clone;

    fn current_size(&self) -> usize;

    fn capacity(&self) -> usize;

    fn policy(&self) -> OverflowPolicy;

    fn is_empty(&self) -> bool {
        self.current_size() == 0
    }

    fn is_full(&self) -> bool {
        self.current_size() == self.capacity()
    }
}
