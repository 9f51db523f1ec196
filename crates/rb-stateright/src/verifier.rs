//! Verifier that checks implementations against the cursor model.
//!
//! Every operation is applied to both the real buffer and a
//! [`RingModelState`]; the returned outcomes, the reported size and the held
//! contents must agree after every step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rb_ring::{HeapRingBuffer, OverflowPolicy, RingBuffer, RingBufferError, TrackedRingBuffer};

use crate::model::{ModelOutcome, RingAction, RingModelState};

/// Bridge between a buffer implementation and the verifier.
pub trait VerifiableRing: RingBuffer<u64> + Send + Sync + Sized {
    fn with_policy(policy: OverflowPolicy, capacity: usize) -> Result<Self, RingBufferError>;
}

impl VerifiableRing for HeapRingBuffer<u64> {
    fn with_policy(policy: OverflowPolicy, capacity: usize) -> Result<Self, RingBufferError> {
        HeapRingBuffer::new(policy, capacity)
    }
}

impl VerifiableRing for TrackedRingBuffer {
    fn with_policy(policy: OverflowPolicy, capacity: usize) -> Result<Self, RingBufferError> {
        TrackedRingBuffer::new(policy, capacity)
    }
}

/// Result of verification.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub passed: bool,
    pub operations_count: usize,
    pub invariants_checked: Vec<String>,
    /// Error message if verification failed.
    pub error: Option<String>,
}

/// Configuration for verification.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub policy: OverflowPolicy,
    pub capacity: usize,
    /// Number of operations to run.
    pub operations_count: usize,
    /// Compare full contents every N operations.
    pub check_interval: usize,
    pub seed: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            policy: OverflowPolicy::Overwrite,
            capacity: 4,
            operations_count: 200,
            check_interval: 10,
            seed: 42,
        }
    }
}

impl VerifierConfig {
    /// Quick verification.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            operations_count: 50,
            ..Self::default()
        }
    }

    /// Thorough verification.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            operations_count: 2_000,
            check_interval: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

const INVARIANTS: [&str; 3] = ["OutcomeMatchesModel", "SizeMatchesModel", "ContentsMatchModel"];

/// Run `action` against a real buffer and express the result as a model outcome.
///
/// A block-policy rejection is an outcome, not an error; lock failures and
/// unknown failures are returned as errors.
pub fn execute<R: RingBuffer<u64>>(
    ring: &R,
    action: RingAction,
) -> Result<ModelOutcome, RingBufferError> {
    match action {
        RingAction::Enqueue(message) => match ring.enqueue_displacing(message) {
            Ok(displaced) => Ok(ModelOutcome::Enqueued { displaced }),
            Err(RingBufferError::ClobberAttempt { slot }) => {
                Ok(ModelOutcome::ClobberRejected { slot })
            }
            Err(err) => Err(err),
        },
        RingAction::Dequeue => ring.dequeue().map(ModelOutcome::Dequeued),
        RingAction::Peek => ring.peek().map(ModelOutcome::Peeked),
        RingAction::Clear => ring.clear_draining().map(ModelOutcome::Cleared),
    }
}

/// Compare size and held contents with the model.
pub fn check_agreement<R: RingBuffer<u64>>(ring: &R, model: &RingModelState) -> Result<(), String> {
    if ring.current_size() != model.count {
        return Err(format!(
            "size {} but model holds {}",
            ring.current_size(),
            model.count
        ));
    }

    let contents = ring.snapshot().map_err(|e| format!("snapshot failed: {}", e))?;
    let expected = model.contents();
    if contents != expected {
        return Err(format!("contents {:?} but model holds {:?}", contents, expected));
    }

    Ok(())
}

/// Replay a fixed action sequence, comparing every step with the model.
///
/// Returns the final model state on success.
pub fn replay_actions<R: RingBuffer<u64>>(
    ring: &R,
    actions: impl IntoIterator<Item = RingAction>,
) -> Result<RingModelState, String> {
    let policy = ring.policy();
    let mut model = RingModelState::new(ring.capacity());

    for (step, action) in actions.into_iter().enumerate() {
        let expected = model.apply(policy, action);
        let actual = execute(ring, action)
            .map_err(|e| format!("step {}: {:?} failed: {}", step, action, e))?;

        if actual != expected {
            return Err(format!(
                "step {}: {:?} returned {:?}, model expected {:?}",
                step, action, actual, expected
            ));
        }
        check_agreement(ring, &model).map_err(|e| format!("step {}: {:?}: {}", step, action, e))?;
    }

    Ok(model)
}

/// Pick the next random action: enqueue 50%, dequeue 30%, peek 15%, clear 5%.
pub fn random_action(rng: &mut impl Rng, next_message: &mut u64) -> RingAction {
    match rng.gen_range(0..100) {
        0..=49 => {
            let message = *next_message;
            *next_message += 1;
            RingAction::Enqueue(message)
        }
        50..=79 => RingAction::Dequeue,
        80..=94 => RingAction::Peek,
        _ => RingAction::Clear,
    }
}

/// Verify an implementation against the model with a seeded random workload.
///
/// Starts with the fill-and-drain pattern from the buffer's own contract
/// (capacity + k enqueues then a full drain), then runs
/// `config.operations_count` random operations.
pub fn verify_implementation<R: VerifiableRing>(config: &VerifierConfig) -> VerificationResult {
    let invariants_checked: Vec<String> = INVARIANTS.iter().map(|s| s.to_string()).collect();
    let fail = |ops: usize, error: String| VerificationResult {
        passed: false,
        operations_count: ops,
        invariants_checked: invariants_checked.clone(),
        error: Some(error),
    };

    // Fill past capacity, then drain.
    let ring = match R::with_policy(config.policy, config.capacity) {
        Ok(ring) => ring,
        Err(e) => return fail(0, format!("construction failed: {}", e)),
    };
    let mut warmup: Vec<RingAction> = (1..=(2 * config.capacity as u64))
        .map(RingAction::Enqueue)
        .collect();
    warmup.extend(std::iter::repeat(RingAction::Dequeue).take(config.capacity + 1));
    let mut ops = warmup.len();
    if let Err(e) = replay_actions(&ring, warmup) {
        return fail(ops, format!("fill and drain: {}", e));
    }

    // Random workload on a fresh buffer.
    let ring = match R::with_policy(config.policy, config.capacity) {
        Ok(ring) => ring,
        Err(e) => return fail(ops, format!("construction failed: {}", e)),
    };
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = RingModelState::new(config.capacity);
    let mut next_message = 1;
    let check_interval = config.check_interval.max(1);

    for i in 0..config.operations_count {
        let action = random_action(&mut rng, &mut next_message);
        let expected = model.apply(config.policy, action);
        ops += 1;

        let actual = match execute(&ring, action) {
            Ok(actual) => actual,
            Err(e) => {
                return fail(
                    ops,
                    format!("seed {}: op {} {:?} failed: {}", config.seed, i, action, e),
                )
            }
        };
        if actual != expected {
            return fail(
                ops,
                format!(
                    "seed {}: op {} {:?} returned {:?}, model expected {:?}",
                    config.seed, i, action, actual, expected
                ),
            );
        }

        if ring.current_size() != model.count {
            return fail(
                ops,
                format!(
                    "seed {}: op {}: size {} but model holds {}",
                    config.seed,
                    i,
                    ring.current_size(),
                    model.count
                ),
            );
        }

        if (i + 1) % check_interval == 0 {
            if let Err(e) = check_agreement(&ring, &model) {
                return fail(ops, format!("seed {}: op {}: {}", config.seed, i, e));
            }
        }
    }

    VerificationResult {
        passed: true,
        operations_count: ops,
        invariants_checked,
        error: None,
    }
}
