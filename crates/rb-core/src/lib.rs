//! # rb-core
//!
//! Core types and invariants for verified SPSC ring buffers.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failure paths as producer/consumer diagrams
//! - `RingBufferProperties`, the view an implementation exposes for checking
//!
//! It has no knowledge of any concrete buffer. Implementations in `rb-ring`
//! (and the harnesses in `rb-dst`) expose their history through
//! `RingBufferProperties` and the checker does the rest.

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{Counterexample, Role, RoleAction, StateSnapshot};
pub use invariants::{RingBufferProperties, RingBufferPropertyChecker};
pub use property::{PropertyChecker, PropertyResult};
