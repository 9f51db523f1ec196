//! Fluent construction.

use crate::error::Result;
use crate::heap::HeapRingBuffer;
use crate::policy::OverflowPolicy;

/// Builder for [`HeapRingBuffer`].
///
/// ```
/// use rb_ring::{OverflowPolicy, RingBuffer, RingBufferBuilder};
///
/// let buffer = RingBufferBuilder::new()
///     .with_policy(OverflowPolicy::Block)
///     .with_capacity(8)
///     .build::<u64>()
///     .unwrap();
/// assert_eq!(buffer.capacity(), 8);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingBufferBuilder {
    policy: OverflowPolicy,
    capacity: Option<usize>,
}

impl RingBufferBuilder {
    /// Overwrite policy, no capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Build the buffer. A missing capacity fails like a zero one.
    pub fn build<T>(self) -> Result<HeapRingBuffer<T>> {
        HeapRingBuffer::new(self.policy, self.capacity.unwrap_or(0))
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::error::RingBufferError;
    use crate::RingBuffer;

    #[test]
    fn test_defaults() {
        let buffer = RingBufferBuilder::new().with_capacity(3).build::<u8>().unwrap();
        assert_eq!(buffer.policy(), OverflowPolicy::Overwrite);
        assert_eq!(buffer.capacity(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_missing_capacity_fails() {
        let err = RingBufferBuilder::new()
            .with_policy(OverflowPolicy::Block)
            .build::<u8>()
            .unwrap_err();
        assert!(matches!(err, RingBufferError::InvalidCapacity { requested: 0 }));
    }

    #[test]
    fn test_last_setting_wins() {
        let buffer = HeapRingBuffer::<u8>::builder()
            .with_policy(OverflowPolicy::Block)
            .with_capacity(1)
            .with_policy(OverflowPolicy::Overwrite)
            .with_capacity(4)
            .build::<u8>()
            .unwrap();
        assert_eq!(buffer.policy(), OverflowPolicy::Overwrite);
        assert_eq!(buffer.capacity(), 4);
    }
}
