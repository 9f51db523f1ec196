//! Overflow policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What enqueue does when the next write slot still holds an unread element.
///
/// Fixed at construction; a buffer never changes policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Replace the oldest unread element.
    #[default]
    Overwrite,
    /// Fail fast with `ClobberAttempt`. Despite the name, never waits.
    Block,
}

impl OverflowPolicy {
    pub const ALL: [OverflowPolicy; 2] = [OverflowPolicy::Overwrite, OverflowPolicy::Block];

    #[must_use]
    pub fn permits_clobber(self) -> bool {
        matches!(self, OverflowPolicy::Overwrite)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::Overwrite => "overwrite",
            OverflowPolicy::Block => "block",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePolicyError {
    #[error("overflow policy `{0}` is not supported")]
    Unsupported(String),

    #[error("unknown overflow policy `{0}` (expected `overwrite` or `block`)")]
    Unknown(String),
}

impl FromStr for OverflowPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(OverflowPolicy::Overwrite),
            "block" => Ok(OverflowPolicy::Block),
            // Declared upstream without any behaviour; refuse rather than guess.
            "resize" => Err(ParsePolicyError::Unsupported(s.to_string())),
            _ => Err(ParsePolicyError::Unknown(s.to_string())),
        }
    }
}
