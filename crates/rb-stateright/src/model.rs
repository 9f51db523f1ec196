//! Ring buffer cursor state machine.
//!
//! A single-threaded reference of the slot array, both cursors and the
//! occupancy count, plus the history needed to account for every message.
//! Each lock-guarded operation of the real buffer is one atomic transition
//! here.
//!
//! # Invariants
//!
//! 1. `BoundedCapacity`: count never exceeds capacity
//! 2. `CountMatchesOccupancy`: count equals the number of occupied slots
//! 3. `CursorsInRange`: both cursors index into the slot array
//! 4. `NoLostMessages`: every accepted message is held, consumed, overwritten or cleared
//! 5. `NoClobberUnderBlock`: the block policy never displaces unread data
//!
//! Reachability checks (`sometimes`): the buffer saturates, and depending on
//! the policy either a message gets overwritten or a clobber gets rejected.

use std::collections::BTreeSet;

use rb_ring::OverflowPolicy;
use stateright::{Checker, Expectation, Model, Property};

/// Snapshot of the buffer plus its history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RingModelState {
    pub slots: Vec<Option<u64>>,
    pub write_cursor: usize,
    pub read_cursor: usize,
    pub count: usize,
    /// Id the next generated enqueue uses.
    pub next_message: u64,
    pub produced: Vec<u64>,
    pub consumed: Vec<u64>,
    pub overwritten: Vec<u64>,
    pub cleared: Vec<u64>,
    pub saw_rejection: bool,
}

/// A single buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingAction {
    Enqueue(u64),
    Dequeue,
    Peek,
    Clear,
}

/// What an operation returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelOutcome {
    Enqueued { displaced: Option<u64> },
    ClobberRejected { slot: usize },
    Dequeued(Option<u64>),
    Peeked(Option<u64>),
    Cleared(Vec<u64>),
}

impl RingModelState {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "capacity must be positive");
        Self {
            slots: vec![None; capacity],
            write_cursor: 0,
            read_cursor: 0,
            count: 0,
            next_message: 1,
            produced: Vec::new(),
            consumed: Vec::new(),
            overwritten: Vec::new(),
            cleared: Vec::new(),
            saw_rejection: false,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) % self.slots.len()
    }

    fn read_order(&self) -> impl Iterator<Item = usize> + '_ {
        let start = self.advance(self.read_cursor);
        (0..self.slots.len()).map(move |offset| (start + offset) % self.slots.len())
    }

    /// Held messages in read order.
    #[must_use]
    pub fn contents(&self) -> Vec<u64> {
        self.read_order().filter_map(|i| self.slots[i]).collect()
    }

    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Apply one operation.
    pub fn apply(&mut self, policy: OverflowPolicy, action: RingAction) -> ModelOutcome {
        match action {
            RingAction::Enqueue(message) => {
                let candidate = self.advance(self.write_cursor);
                if !policy.permits_clobber() && self.slots[candidate].is_some() {
                    self.saw_rejection = true;
                    return ModelOutcome::ClobberRejected { slot: candidate };
                }

                self.write_cursor = candidate;
                let displaced = self.slots[candidate].replace(message);
                match displaced {
                    Some(old) => self.overwritten.push(old),
                    None if self.count < self.capacity() => self.count += 1,
                    None => {}
                }
                self.produced.push(message);
                self.next_message = self.next_message.max(message + 1);

                ModelOutcome::Enqueued { displaced }
            }
            RingAction::Dequeue => {
                let candidate = self.advance(self.read_cursor);
                let taken = self.slots[candidate].take();
                if let Some(message) = taken {
                    self.read_cursor = candidate;
                    self.count = self.count.saturating_sub(1);
                    self.consumed.push(message);
                }
                ModelOutcome::Dequeued(taken)
            }
            RingAction::Peek => ModelOutcome::Peeked(self.slots[self.advance(self.read_cursor)]),
            RingAction::Clear => {
                let order: Vec<usize> = self.read_order().collect();
                let drained: Vec<u64> = order
                    .into_iter()
                    .filter_map(|i| self.slots[i].take())
                    .collect();
                self.count = 0;
                self.cleared.extend_from_slice(&drained);
                ModelOutcome::Cleared(drained)
            }
        }
    }

    fn all_accounted(&self) -> bool {
        let accounted: BTreeSet<u64> = self
            .consumed
            .iter()
            .chain(&self.overwritten)
            .chain(&self.cleared)
            .copied()
            .chain(self.slots.iter().flatten().copied())
            .collect();
        self.produced.iter().all(|m| accounted.contains(m))
    }
}

/// Stateright model of one buffer under a fixed policy.
#[derive(Debug, Clone)]
pub struct RingModel {
    pub policy: OverflowPolicy,
    pub capacity: usize,
    /// Upper bound on generated message ids, which keeps the space finite.
    pub max_messages: u64,
}

impl RingModel {
    #[must_use]
    pub fn new(policy: OverflowPolicy, capacity: usize, max_messages: u64) -> Self {
        debug_assert!(capacity > 0, "capacity must be positive");
        Self {
            policy,
            capacity,
            max_messages,
        }
    }
}

impl Model for RingModel {
    type State = RingModelState;
    type Action = RingAction;

    fn init_states(&self) -> Vec<Self::State> {
        vec![RingModelState::new(self.capacity)]
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        if state.next_message <= self.max_messages {
            actions.push(RingAction::Enqueue(state.next_message));
        }
        actions.push(RingAction::Dequeue);
        actions.push(RingAction::Clear);
    }

    fn next_state(&self, last_state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut state = last_state.clone();
        state.apply(self.policy, action);
        Some(state)
    }

    fn properties(&self) -> Vec<Property<Self>> {
        let mut properties = vec![
            Property::<Self>::always("bounded capacity", |_, state: &RingModelState| {
                state.count <= state.capacity()
            }),
            Property::<Self>::always("count matches occupancy", |_, state: &RingModelState| {
                state.count == state.occupied()
            }),
            Property::<Self>::always("cursors in range", |_, state: &RingModelState| {
                state.write_cursor < state.capacity() && state.read_cursor < state.capacity()
            }),
            Property::<Self>::always("no lost messages", |_, state: &RingModelState| {
                state.all_accounted()
            }),
            Property::<Self>::always("no clobber under block", |model: &RingModel, state| {
                model.policy.permits_clobber() || state.overwritten.is_empty()
            }),
            Property::<Self>::sometimes("buffer saturated", |_, state: &RingModelState| {
                state.count == state.capacity()
            }),
        ];

        match self.policy {
            OverflowPolicy::Overwrite => {
                properties.push(Property::<Self>::sometimes(
                    "message overwritten",
                    |_, state: &RingModelState| !state.overwritten.is_empty(),
                ));
            }
            OverflowPolicy::Block => {
                properties.push(Property::<Self>::sometimes(
                    "clobber rejected",
                    |_, state: &RingModelState| state.saw_rejection,
                ));
            }
        }

        properties
    }
}

/// Outcome of exhaustively checking one model configuration.
#[derive(Debug, Clone)]
pub struct ModelCheckSummary {
    pub policy: OverflowPolicy,
    pub capacity: usize,
    pub unique_states: usize,
    /// `always` properties with a counterexample.
    pub violated: Vec<&'static str>,
    /// `sometimes` properties never witnessed.
    pub unreached: Vec<&'static str>,
}

impl ModelCheckSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violated.is_empty() && self.unreached.is_empty()
    }

    #[must_use]
    pub fn format(&self) -> String {
        if self.passed() {
            format!(
                "[PASS] stateright ({}, capacity {}): {} states explored",
                self.policy, self.capacity, self.unique_states
            )
        } else {
            format!(
                "[FAIL] stateright ({}, capacity {}): {} states explored\n  Violated: {:?}\n  Unreached: {:?}",
                self.policy, self.capacity, self.unique_states, self.violated, self.unreached
            )
        }
    }
}

/// Run a BFS over every reachable state of the model.
#[must_use]
pub fn check_model(
    policy: OverflowPolicy,
    capacity: usize,
    max_messages: u64,
) -> ModelCheckSummary {
    let model = RingModel::new(policy, capacity, max_messages);
    let properties = model.properties();
    let checker = model.checker().spawn_bfs().join();

    let mut violated = Vec::new();
    let mut unreached = Vec::new();
    for property in properties {
        let found = checker.discovery(property.name).is_some();
        match property.expectation {
            Expectation::Always | Expectation::Eventually if found => violated.push(property.name),
            Expectation::Sometimes if !found => unreached.push(property.name),
            _ => {}
        }
    }

    ModelCheckSummary {
        policy,
        capacity,
        unique_states: checker.unique_state_count(),
        violated,
        unreached,
    }
}
