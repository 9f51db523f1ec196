//! Kani proof harnesses for the heap ring buffer.
//!
//! Bounded model checking of the sequential cursor discipline for every
//! operation sequence up to the unwind bound.
//!
//! ```bash
//! cargo kani -p rb-ring
//! cargo kani -p rb-ring --harness proof_count_matches_occupancy
//! ```
//!
//! Kani runs single-threaded; lock contention is covered by the loom tests.

#[cfg(kani)]
mod proofs {
    use crate::{HeapRingBuffer, OverflowPolicy, RingBuffer, RingBufferError};

    fn any_policy() -> OverflowPolicy {
        if kani::any() {
            OverflowPolicy::Overwrite
        } else {
            OverflowPolicy::Block
        }
    }

    /// Zero capacity is always rejected, anything else is accepted.
    #[kani::proof]
    fn proof_construction_validates_capacity() {
        let capacity: usize = kani::any();
        kani::assume(capacity <= 4);

        let result = HeapRingBuffer::<u8>::new(any_policy(), capacity);
        if capacity == 0 {
            kani::assert(
                matches!(result, Err(RingBufferError::InvalidCapacity { requested: 0 })),
                "Zero capacity must fail construction",
            );
        } else {
            kani::assert(result.is_ok(), "Positive capacity must construct");
        }
    }

    /// Size never exceeds capacity and always equals the occupied slots.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_count_matches_occupancy() {
        let capacity: usize = kani::any();
        kani::assume(capacity >= 1 && capacity <= 3);
        let Ok(buffer) = HeapRingBuffer::<u8>::new(any_policy(), capacity) else {
            return;
        };

        for step in 0..4u8 {
            match kani::any::<u8>() % 3 {
                0 => {
                    let _ = buffer.enqueue(step);
                }
                1 => {
                    let _ = buffer.dequeue();
                }
                _ => {
                    let _ = buffer.clear();
                }
            }

            kani::assert(
                buffer.current_size() <= buffer.capacity(),
                "Size must never exceed capacity",
            );
            let held = buffer.snapshot().map(|s| s.len()).unwrap_or(usize::MAX);
            kani::assert(
                held == buffer.current_size(),
                "Size must equal the number of occupied slots",
            );
        }
    }

    /// Under the block policy an accepted enqueue never displaces anything,
    /// and a rejected one leaves the contents alone.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_block_never_clobbers() {
        let capacity: usize = kani::any();
        kani::assume(capacity >= 1 && capacity <= 3);
        let Ok(buffer) = HeapRingBuffer::<u8>::new(OverflowPolicy::Block, capacity) else {
            return;
        };

        for step in 0..4u8 {
            if kani::any() {
                let before = buffer.snapshot().unwrap_or_default();
                match buffer.enqueue_displacing(step) {
                    Ok(displaced) => {
                        kani::assert(displaced.is_none(), "Block policy must not displace")
                    }
                    Err(_) => kani::assert(
                        buffer.snapshot().unwrap_or_default() == before,
                        "Rejected enqueue must not mutate",
                    ),
                }
            } else {
                let _ = buffer.dequeue();
            }
        }
    }

    /// Peek returns what the next dequeue returns and changes nothing.
    #[kani::proof]
    #[kani::unwind(5)]
    fn proof_peek_matches_dequeue() {
        let Ok(buffer) = HeapRingBuffer::<u8>::new(any_policy(), 2) else {
            return;
        };

        let pushes: u8 = kani::any();
        kani::assume(pushes <= 3);
        for value in 0..pushes {
            let _ = buffer.enqueue(value);
        }

        let size = buffer.current_size();
        let peeked = buffer.peek().ok().flatten();
        kani::assert(buffer.current_size() == size, "Peek must not change size");

        let dequeued = buffer.dequeue().ok().flatten();
        kani::assert(peeked == dequeued, "Peek must agree with the next dequeue");
    }

    /// Without overflow, elements come out in the order they went in.
    #[kani::proof]
    #[kani::unwind(5)]
    fn proof_fifo_within_capacity() {
        let Ok(buffer) = HeapRingBuffer::<u8>::new(any_policy(), 3) else {
            return;
        };

        let v1: u8 = kani::any();
        let v2: u8 = kani::any();
        kani::assume(v1 != v2);

        let _ = buffer.enqueue(v1);
        let _ = buffer.enqueue(v2);

        kani::assert(buffer.dequeue().ok().flatten() == Some(v1), "First in, first out");
        kani::assert(buffer.dequeue().ok().flatten() == Some(v2), "Second in, second out");
        kani::assert(buffer.dequeue().ok().flatten().is_none(), "Drained buffer is empty");
    }
}
