//! # rb-stateright
//!
//! Stateright model of the ring buffer cursor discipline.
//!
//! ## Usage
//!
//! 1. Model checking (verify the state machine itself):
//!    ```ignore
//!    cargo test -p rb-stateright
//!    ```
//!
//! 2. Implementation verification (verify code against the model):
//!    ```ignore
//!    use rb_stateright::{verify_implementation, VerifierConfig};
//!    let result = verify_implementation::<HeapRingBuffer<u64>>(&VerifierConfig::quick());
//!    assert!(result.passed);
//!    ```
//!
//! 3. Path replay: paths discovered by the checker (e.g. the shortest path
//!    to a rejected clobber) can be fed to `replay_actions` against a real
//!    buffer.

pub mod model;
pub mod verifier;

pub use model::{
    check_model, ModelCheckSummary, ModelOutcome, RingAction, RingModel, RingModelState,
};
pub use verifier::{
    check_agreement, execute, random_action, replay_actions, verify_implementation,
    VerifiableRing, VerificationResult, VerifierConfig,
};
