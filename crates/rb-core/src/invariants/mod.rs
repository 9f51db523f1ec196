//! Invariant traits for verified ring buffers.
//!
//! - `ring_buffer`: SPSC ring buffer invariants (NoLostMessages, NoDuplicates,
//!   BoundedCapacity, SizeMatchesContents, FIFO_Order, NoClobberUnderBlock)

pub mod ring_buffer;

pub use ring_buffer::{RingBufferProperties, RingBufferPropertyChecker};
