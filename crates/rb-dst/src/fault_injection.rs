//! Fault injection for ring buffers.
//!
//! Faults are injected at OPERATION BOUNDARIES, never inside the locked
//! section. The buffer under test is unchanged; the harness decides what
//! happens around each call.
//!
//! # What DST Tests (vs Loom)
//!
//! | Concern | Tool | Level |
//! |---------|------|-------|
//! | Lock contention, torn reads | Loom | Instruction (automatic) |
//! | Caller dies before or after an operation | DST | Operation boundary |
//! | A third party clears the buffer | DST | Operation boundary |
//! | A reader peeks between producer and consumer | DST | Operation boundary |
//!
//! # Architecture
//!
//! ```text
//!  FaultPoint (pre-op) ──> ring.enqueue()/dequeue()/... ──> FaultPoint (post-op)
//!         │                          │                              │
//!         ▼                          ▼                              ▼
//!  "Caller crashed?"        shadow model applies         "Result never seen?"
//!  "Interfering clear?"     the same action; outcomes
//!                           must match
//! ```
//!
//! The runner records what the buffer actually returned (produced,
//! consumed, overwritten, cleared) and exposes it through
//! `RingBufferProperties`, so the invariant checker audits the real buffer.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use rb_core::{
    Counterexample, PropertyChecker, PropertyResult, RingBufferProperties,
    RingBufferPropertyChecker, Role, RoleAction,
};
use rb_ring::{OverflowPolicy, RingBuffer, RingBufferError};
use rb_stateright::{
    check_agreement, execute, random_action, ModelOutcome, RingAction, RingModelState,
    VerifiableRing,
};
use thiserror::Error;

use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;
use crate::DstConfig;

/// Most recent operations kept for the failure diagram.
const TRACE_LEN: usize = 16;

/// Fault injection points (between operations, not inside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    BeforeOperation,
    AfterOperation,
}

/// Types of faults that can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultType {
    /// Caller dies. Before the operation it never starts; after, its result is lost.
    CallerCrash,
    /// Another party clears the buffer.
    InterferingClear,
    /// Another reader peeks; must not change anything.
    InterferingPeek,
    /// Slow caller. No effect on a sequential run beyond being counted.
    Delay,
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum DstError {
    #[error("injected fault: {0}")]
    Fault(FaultType),

    #[error(transparent)]
    Ring(#[from] RingBufferError),

    #[error("step {step}: {detail}")]
    ModelDivergence { step: u64, detail: String },

    #[error("invalid {var}={value}: expected an unsigned integer")]
    InvalidEnv { var: &'static str, value: String },
}

/// DST runner for ring buffers.
///
/// Wraps a real buffer, injects faults at operation boundaries and checks
/// every outcome against a shadow [`RingModelState`].
pub struct DstRunner<R> {
    ring: R,
    policy: OverflowPolicy,
    shadow: RingModelState,
    rng: DeterministicRng,
    fault_injector: FaultInjector,
    seed: u64,
    // Observed history
    produced: Vec<u64>,
    consumed: Vec<u64>,
    overwritten: Vec<u64>,
    cleared: Vec<u64>,
    trace: VecDeque<RoleAction>,
    // Statistics
    operations_count: u64,
    abandoned_operations: u64,
    interfering_clears: u64,
    rejected_enqueues: u64,
}

impl<R: VerifiableRing> DstRunner<R> {
    pub fn new(
        seed: u64,
        policy: OverflowPolicy,
        capacity: usize,
        faults: FaultConfig,
    ) -> Result<Self, DstError> {
        let ring = R::with_policy(policy, capacity)?;
        let rng = DeterministicRng::new(seed);
        let fault_injector = FaultInjector::new(rng.fork(1), faults);

        Ok(Self {
            ring,
            policy,
            shadow: RingModelState::new(capacity),
            rng,
            fault_injector,
            seed,
            produced: Vec::new(),
            consumed: Vec::new(),
            overwritten: Vec::new(),
            cleared: Vec::new(),
            trace: VecDeque::with_capacity(TRACE_LEN),
            operations_count: 0,
            abandoned_operations: 0,
            interfering_clears: 0,
            rejected_enqueues: 0,
        })
    }

    /// Get the seed for reproduction.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn ring(&self) -> &R {
        &self.ring
    }

    /// Run one action with fault injection at both boundaries.
    pub fn step(&mut self, action: RingAction) -> Result<ModelOutcome, DstError> {
        if let Some(fault) = self.maybe_inject_fault(FaultPoint::BeforeOperation)? {
            if fault == FaultType::CallerCrash {
                self.abandoned_operations += 1;
                return Err(DstError::Fault(fault));
            }
        }

        let outcome = self.apply(action)?;

        if let Some(fault) = self.maybe_inject_fault(FaultPoint::AfterOperation)? {
            if fault == FaultType::CallerCrash {
                // The operation completed; only the caller lost the result.
                self.abandoned_operations += 1;
                return Err(DstError::Fault(fault));
            }
        }

        Ok(outcome)
    }

    pub fn enqueue(&mut self, message: u64) -> Result<Option<u64>, DstError> {
        match self.step(RingAction::Enqueue(message))? {
            ModelOutcome::Enqueued { displaced } => Ok(displaced),
            ModelOutcome::ClobberRejected { slot } => {
                Err(RingBufferError::ClobberAttempt { slot }.into())
            }
            other => Err(self.divergence(format!("enqueue returned {:?}", other))),
        }
    }

    pub fn dequeue(&mut self) -> Result<Option<u64>, DstError> {
        match self.step(RingAction::Dequeue)? {
            ModelOutcome::Dequeued(message) => Ok(message),
            other => Err(self.divergence(format!("dequeue returned {:?}", other))),
        }
    }

    /// Execute on both the buffer and the shadow and compare.
    fn apply(&mut self, action: RingAction) -> Result<ModelOutcome, DstError> {
        self.operations_count += 1;

        let expected = self.shadow.apply(self.policy, action);
        let actual = execute(&self.ring, action)?;

        match &actual {
            ModelOutcome::Enqueued { displaced } => {
                if let RingAction::Enqueue(message) = action {
                    self.produced.push(message);
                }
                self.overwritten.extend(*displaced);
            }
            ModelOutcome::ClobberRejected { .. } => self.rejected_enqueues += 1,
            ModelOutcome::Dequeued(message) => self.consumed.extend(*message),
            ModelOutcome::Peeked(_) => {}
            ModelOutcome::Cleared(drained) => self.cleared.extend_from_slice(drained),
        }
        self.record(action, &actual);

        if actual != expected {
            return Err(self.divergence(format!(
                "{:?} returned {:?}, model expected {:?}",
                action, actual, expected
            )));
        }
        check_agreement(&self.ring, &self.shadow)
            .map_err(|detail| self.divergence(format!("after {:?}: {}", action, detail)))?;

        Ok(actual)
    }

    fn record(&mut self, action: RingAction, outcome: &ModelOutcome) {
        let (role, call) = match action {
            RingAction::Enqueue(message) => (Role::Producer, format!("enqueue({})", message)),
            RingAction::Dequeue => (Role::Consumer, "dequeue()".to_string()),
            RingAction::Peek => (Role::Consumer, "peek()".to_string()),
            RingAction::Clear => (Role::Consumer, "clear()".to_string()),
        };
        let described = match outcome {
            ModelOutcome::Enqueued { displaced: None } => call,
            ModelOutcome::Enqueued {
                displaced: Some(old),
            } => format!("{} -> displaced {}", call, old),
            ModelOutcome::ClobberRejected { slot } => format!("{} slot {}", call, slot),
            ModelOutcome::Dequeued(message) | ModelOutcome::Peeked(message) => {
                format!("{} -> {:?}", call, message)
            }
            ModelOutcome::Cleared(drained) => format!("{} -> {} dropped", call, drained.len()),
        };

        if self.trace.len() == TRACE_LEN {
            self.trace.pop_front();
        }
        self.trace.push_back(RoleAction {
            role,
            step: self.operations_count,
            action: described,
            success: !matches!(outcome, ModelOutcome::ClobberRejected { .. }),
        });
    }

    /// The tail of the run as a producer/consumer diagram.
    #[must_use]
    pub fn counterexample(&self, description: impl Into<String>) -> Counterexample {
        let mut trace = if self.seed == 0 {
            Counterexample::new()
        } else {
            Counterexample::with_seed(self.seed)
        }
        .with_description(description);

        for action in &self.trace {
            trace.add_action(action.clone());
        }
        trace
    }

    fn divergence(&self, detail: String) -> DstError {
        DstError::ModelDivergence {
            step: self.operations_count,
            detail,
        }
    }

    /// Maybe inject a fault at the given point. Interfering faults run here.
    fn maybe_inject_fault(&mut self, point: FaultPoint) -> Result<Option<FaultType>, DstError> {
        if !self.fault_injector.should_fail() {
            return Ok(None);
        }

        let fault = match self.rng.gen_range(0..4) {
            0 => FaultType::CallerCrash,
            1 => FaultType::InterferingClear,
            2 => FaultType::InterferingPeek,
            _ => FaultType::Delay,
        };
        debug!(?point, %fault, seed = self.seed, "injecting fault");

        match fault {
            FaultType::InterferingClear => {
                self.interfering_clears += 1;
                self.apply(RingAction::Clear)?;
            }
            FaultType::InterferingPeek => {
                self.apply(RingAction::Peek)?;
            }
            FaultType::CallerCrash | FaultType::Delay => {}
        }

        Ok(Some(fault))
    }

    /// Check every ring buffer invariant against the observed history.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<PropertyResult> {
        let checker = RingBufferPropertyChecker::new(self);
        if self.seed == 0 {
            checker.check_all()
        } else {
            checker.with_seed(self.seed).check_all()
        }
    }

    #[must_use]
    pub fn stats(&self) -> DstStats {
        DstStats {
            seed: self.seed,
            policy: self.policy,
            capacity: self.ring.capacity(),
            operations_count: self.operations_count,
            faults_injected: self.fault_injector.injected_count(),
            abandoned_operations: self.abandoned_operations,
            interfering_clears: self.interfering_clears,
            rejected_enqueues: self.rejected_enqueues,
            produced: self.produced.len() as u64,
            consumed: self.consumed.len() as u64,
            overwritten: self.overwritten.len() as u64,
            cleared: self.cleared.len() as u64,
        }
    }
}

impl<R: VerifiableRing> RingBufferProperties for DstRunner<R> {
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
        self.ring.snapshot().unwrap_or_default()
    }

    fn reported_size(&self) -> u64 {
        self.ring.current_size() as u64
    }

    fn max_capacity(&self) -> u64 {
        self.ring.capacity() as u64
    }

    fn permits_overwrite(&self) -> bool {
        self.policy.permits_clobber()
    }
}

/// Statistics from a DST run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DstStats {
    pub seed: u64,
    pub policy: OverflowPolicy,
    pub capacity: usize,
    pub operations_count: u64,
    pub faults_injected: u64,
    pub abandoned_operations: u64,
    pub interfering_clears: u64,
    pub rejected_enqueues: u64,
    pub produced: u64,
    pub consumed: u64,
    pub overwritten: u64,
    pub cleared: u64,
}

impl DstStats {
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "DST_SEED={} policy={} capacity={} ops={} faults={} abandoned={} rejected={} produced={} consumed={} overwritten={} cleared={}",
            self.seed,
            self.policy,
            self.capacity,
            self.operations_count,
            self.faults_injected,
            self.abandoned_operations,
            self.rejected_enqueues,
            self.produced,
            self.consumed,
            self.overwritten,
            self.cleared
        )
    }
}

/// DST result.
#[derive(Debug)]
pub struct DstResult {
    pub passed: bool,
    pub properties: Vec<PropertyResult>,
    /// First disagreement between the buffer and the model, if any.
    pub divergence: Option<String>,
    /// Operations leading up to the divergence.
    pub counterexample: Option<Counterexample>,
    pub stats: DstStats,
    pub fault_errors: Vec<String>,
}

impl DstResult {
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!("[{}] {}", status, self.stats.format());

        if let Some(divergence) = &self.divergence {
            result.push_str(&format!("\n  DIVERGENCE: {}", divergence));
        }
        if let Some(trace) = &self.counterexample {
            result.push('\n');
            result.push_str(&trace.render_diagram());
        }
        for property in self.properties.iter().filter(|p| !p.holds) {
            result.push_str(&format!("\n  VIOLATION: {}", property));
        }

        result
    }
}

/// Generate a seeded operation mix for a scenario.
pub fn random_operations(rng: &mut DeterministicRng, count: usize) -> Vec<RingAction> {
    let mut next_message = 1;
    (0..count)
        .map(|_| random_action(rng.rng(), &mut next_message))
        .collect()
}

/// Run a DST scenario.
///
/// Operations run with fault injection; injected faults and block-policy
/// rejections are expected and recorded. The run stops at the first model
/// divergence. Invariants are checked at the end.
pub fn run_dst_scenario<R: VerifiableRing>(
    config: &DstConfig,
    operations: Vec<RingAction>,
) -> Result<DstResult, DstError> {
    let mut runner: DstRunner<R> =
        DstRunner::new(config.seed, config.policy, config.capacity, config.faults)?;
    let mut errors = Vec::new();
    let mut divergence = None;
    let mut counterexample = None;

    for op in operations {
        match runner.step(op) {
            Ok(_) => {}
            Err(DstError::Fault(fault)) => errors.push(format!("{:?}", fault)),
            Err(err @ DstError::ModelDivergence { .. }) => {
                let detail = err.to_string();
                counterexample = Some(runner.counterexample(detail.clone()));
                divergence = Some(detail);
                break;
            }
            Err(err) => return Err(err),
        }
    }

    let properties = runner.check_invariants();
    let passed = divergence.is_none() && properties.iter().all(|p| p.holds);

    Ok(DstResult {
        passed,
        properties,
        divergence,
        counterexample,
        stats: runner.stats(),
        fault_errors: errors,
    })
}
