//! Ring buffer invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostMessages | Every produced message is in the buffer, consumed, overwritten or cleared |
//! | NoDuplicates | No message is delivered twice or held twice |
//! | BoundedCapacity | Buffer never holds more than its capacity |
//! | SizeMatchesContents | Reported size equals the number of occupied slots |
//! | FIFO_Order | Without overwrite or clear, messages are consumed in production order |
//! | NoClobberUnderBlock | A buffer that rejects clobbers never overwrites a message |
//!
//! Messages are `u64` identifiers that must be unique per history.

use std::collections::HashSet;

use crate::counterexample::{Counterexample, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Properties that any ring buffer implementation must expose for checking.
///
/// All histories are in the order the operations took effect.
pub trait RingBufferProperties {
    /// Messages accepted by enqueue.
    fn produced_messages(&self) -> Vec<u64>;

    /// Messages handed out by dequeue.
    fn consumed_messages(&self) -> Vec<u64>;

    /// Unread messages displaced by an overwriting enqueue.
    fn overwritten_messages(&self) -> Vec<u64>;

    /// Unread messages dropped by clear.
    fn cleared_messages(&self) -> Vec<u64>;

    /// Messages currently held, in read order.
    fn current_contents(&self) -> Vec<u64>;

    /// The size the buffer reports through its fast-path counter.
    fn reported_size(&self) -> u64;

    fn max_capacity(&self) -> u64;

    /// Whether the overflow policy allows clobbering unread data.
    fn permits_overwrite(&self) -> bool;
}

/// Property checker for ring buffer implementations.
pub struct RingBufferPropertyChecker<'a, T: RingBufferProperties> {
    buffer: &'a T,
    dst_seed: Option<u64>,
}

impl<'a, T: RingBufferProperties> RingBufferPropertyChecker<'a, T> {
    #[must_use]
    pub fn new(buffer: &'a T) -> Self {
        Self {
            buffer,
            dst_seed: None,
        }
    }

    /// Set DST seed for counterexample reproduction.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(&self) -> Counterexample {
        match self.dst_seed {
            Some(seed) => Counterexample::with_seed(seed),
            None => Counterexample::new(),
        }
    }

    /// NoLostMessages
    ///
    /// A message may leave the buffer only by being consumed, overwritten
    /// or cleared. Anything else is a lost message.
    fn check_no_lost_messages(&self) -> PropertyResult {
        let produced = self.buffer.produced_messages();
        let consumed = self.buffer.consumed_messages();
        let overwritten = self.buffer.overwritten_messages();
        let cleared = self.buffer.cleared_messages();
        let contents = self.buffer.current_contents();

        let accounted: HashSet<u64> = consumed
            .iter()
            .chain(&overwritten)
            .chain(&cleared)
            .chain(&contents)
            .copied()
            .collect();

        for msg in &produced {
            if !accounted.contains(msg) {
                let mut ce = self
                    .counterexample()
                    .with_description(format!("Message {} lost", msg));
                ce.add_state(StateSnapshot {
                    step: 1,
                    description: format!("Message {} lost", msg),
                    variables: vec![
                        ("produced".to_string(), format!("{:?}", produced)),
                        ("consumed".to_string(), format!("{:?}", consumed)),
                        ("overwritten".to_string(), format!("{:?}", overwritten)),
                        ("cleared".to_string(), format!("{:?}", cleared)),
                        ("contents".to_string(), format!("{:?}", contents)),
                    ],
                });
                return PropertyResult::fail(
                    "NoLostMessages",
                    format!(
                        "Message {} was produced but is neither in the buffer, consumed, overwritten nor cleared",
                        msg
                    ),
                    Some(ce),
                );
            }
        }

        PropertyResult::pass("NoLostMessages")
    }

    /// NoDuplicates
    fn check_no_duplicates(&self) -> PropertyResult {
        let mut seen = HashSet::new();
        for msg in self.buffer.consumed_messages() {
            if !seen.insert(msg) {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!("Message {} was consumed more than once", msg),
                    None,
                );
            }
        }

        let contents = self.buffer.current_contents();
        let mut held = HashSet::new();
        for msg in &contents {
            if !held.insert(*msg) {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!("Message {} occupies more than one slot: {:?}", msg, contents),
                    None,
                );
            }
            if seen.contains(msg) {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!("Message {} was consumed but is still held", msg),
                    None,
                );
            }
        }

        PropertyResult::pass("NoDuplicates")
    }

    /// BoundedCapacity
    fn check_bounded_capacity(&self) -> PropertyResult {
        let held = self.buffer.current_contents().len() as u64;
        let reported = self.buffer.reported_size();
        let capacity = self.buffer.max_capacity();

        if held > capacity || reported > capacity {
            return PropertyResult::fail(
                "BoundedCapacity",
                format!(
                    "Buffer holds {} items (reports {}) but capacity is {}",
                    held, reported, capacity
                ),
                None,
            );
        }

        PropertyResult::pass("BoundedCapacity")
    }

    /// SizeMatchesContents
    ///
    /// Only meaningful while the buffer is quiescent.
    fn check_size_matches_contents(&self) -> PropertyResult {
        let held = self.buffer.current_contents().len() as u64;
        let reported = self.buffer.reported_size();

        if held != reported {
            return PropertyResult::fail(
                "SizeMatchesContents",
                format!("Buffer reports size {} but holds {} items", reported, held),
                None,
            );
        }

        PropertyResult::pass("SizeMatchesContents")
    }

    /// FIFO_Order
    ///
    /// Overwrites displace messages without moving the read cursor and
    /// clear leaves both cursors in place, so either can legitimately
    /// reorder delivery. The check applies to histories with neither.
    fn check_fifo_order(&self) -> PropertyResult {
        if !self.buffer.overwritten_messages().is_empty()
            || !self.buffer.cleared_messages().is_empty()
        {
            return PropertyResult::pass("FIFO_Order");
        }

        let produced = self.buffer.produced_messages();
        let consumed = self.buffer.consumed_messages();

        for (i, msg) in consumed.iter().enumerate() {
            if i >= produced.len() {
                return PropertyResult::fail(
                    "FIFO_Order",
                    format!("Consumed message {} at index {} was never produced", msg, i),
                    None,
                );
            }
            if *msg != produced[i] {
                return PropertyResult::fail(
                    "FIFO_Order",
                    format!(
                        "Consumed message at index {} is {} but produced was {}",
                        i, msg, produced[i]
                    ),
                    None,
                );
            }
        }

        PropertyResult::pass("FIFO_Order")
    }

    /// NoClobberUnderBlock
    fn check_no_clobber_under_block(&self) -> PropertyResult {
        if self.buffer.permits_overwrite() {
            return PropertyResult::pass("NoClobberUnderBlock");
        }

        let overwritten = self.buffer.overwritten_messages();
        if let Some(msg) = overwritten.first() {
            return PropertyResult::fail(
                "NoClobberUnderBlock",
                format!(
                    "Message {} was overwritten before being read ({} clobbered in total)",
                    msg,
                    overwritten.len()
                ),
                None,
            );
        }

        PropertyResult::pass("NoClobberUnderBlock")
    }
}

impl<T: RingBufferProperties> PropertyChecker for RingBufferPropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_messages(),
            self.check_no_duplicates(),
            self.check_bounded_capacity(),
            self.check_size_matches_contents(),
            self.check_fifo_order(),
            self.check_no_clobber_under_block(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain record of a ring history.
    #[derive(Default)]
    struct TestRing {
        produced: Vec<u64>,
        consumed: Vec<u64>,
        overwritten: Vec<u64>,
        cleared: Vec<u64>,
        contents: Vec<u64>,
        size: u64,
        capacity: u64,
        overwrite: bool,
    }

    impl RingBufferProperties for TestRing {
        fn produced_messages(&self) -> Vec<u64> {
            self.produced.clone()
        }

        fn consumed_messages(&self) -> Vec<u64> {
            self.consumed.clone()
        }

        fn overwritten_messages(&self) -> Vec<u64> {
            self.overwritten.clone()
        }

        fn cleared_messages(&self) -> Vec<u64> {
            self.cleared.clone()
        }

        fn current_contents(&self) -> Vec<u64> {
            self.contents.clone()
        }

        fn reported_size(&self) -> u64 {
            self.size
        }

        fn max_capacity(&self) -> u64 {
            self.capacity
        }

        fn permits_overwrite(&self) -> bool {
            self.overwrite
        }
    }

    fn result<'a>(results: &'a [PropertyResult], name: &str) -> &'a PropertyResult {
        results.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_correct_history_passes_all() {
        let ring = TestRing {
            produced: vec![1, 2, 3, 4],
            consumed: vec![1, 2],
            contents: vec![3, 4],
            size: 2,
            capacity: 4,
            ..TestRing::default()
        };

        let checker = RingBufferPropertyChecker::new(&ring);
        assert!(checker.all_hold(), "{:?}", checker.violations());
    }

    #[test]
    fn test_overwritten_messages_are_not_lost() {
        // capacity 2, produced 1..=4, 1 and 2 displaced
        let ring = TestRing {
            produced: vec![1, 2, 3, 4],
            overwritten: vec![1, 2],
            contents: vec![3, 4],
            size: 2,
            capacity: 2,
            overwrite: true,
            ..TestRing::default()
        };

        let checker = RingBufferPropertyChecker::new(&ring);
        assert!(checker.all_hold(), "{:?}", checker.violations());
    }

    #[test]
    fn test_lost_message_detected() {
        let ring = TestRing {
            produced: vec![1, 2, 3],
            consumed: vec![1],
            contents: vec![2], // 3 vanished
            size: 1,
            capacity: 4,
            ..TestRing::default()
        };

        let checker = RingBufferPropertyChecker::new(&ring).with_seed(99);
        let results = checker.check_all();

        let no_lost = result(&results, "NoLostMessages");
        assert!(!no_lost.holds);
        assert!(no_lost.violation.as_ref().unwrap().contains('3'));
        let ce = no_lost.counterexample.as_ref().unwrap();
        assert_eq!(ce.dst_seed, Some(99));
    }

    #[test]
    fn test_duplicate_delivery_detected() {
        let ring = TestRing {
            produced: vec![1, 2],
            consumed: vec![1, 1],
            contents: vec![2],
            size: 1,
            capacity: 4,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        assert!(!result(&results, "NoDuplicates").holds);
    }

    #[test]
    fn test_capacity_overrun_detected() {
        let ring = TestRing {
            produced: vec![1, 2, 3],
            contents: vec![1, 2, 3],
            size: 3,
            capacity: 2,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        assert!(!result(&results, "BoundedCapacity").holds);
    }

    #[test]
    fn test_size_drift_detected() {
        let ring = TestRing {
            produced: vec![1, 2],
            contents: vec![1, 2],
            size: 1,
            capacity: 4,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        let size = result(&results, "SizeMatchesContents");
        assert!(!size.holds);
        assert!(size.violation.as_ref().unwrap().contains("reports size 1"));
    }

    #[test]
    fn test_fifo_violation_detected() {
        let ring = TestRing {
            produced: vec![1, 2, 3],
            consumed: vec![2, 1],
            contents: vec![3],
            size: 1,
            capacity: 4,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        assert!(!result(&results, "FIFO_Order").holds);
    }

    #[test]
    fn test_fifo_not_checked_after_clear() {
        let ring = TestRing {
            produced: vec![1, 2, 3],
            consumed: vec![3],
            cleared: vec![1, 2],
            size: 0,
            capacity: 4,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        assert!(result(&results, "FIFO_Order").holds);
        assert!(result(&results, "NoLostMessages").holds);
    }

    #[test]
    fn test_clobber_under_block_detected() {
        let ring = TestRing {
            produced: vec![1, 2, 3],
            overwritten: vec![1],
            contents: vec![2, 3],
            size: 2,
            capacity: 2,
            overwrite: false,
            ..TestRing::default()
        };

        let results = RingBufferPropertyChecker::new(&ring).check_all();
        assert!(!result(&results, "NoClobberUnderBlock").holds);
    }
}
