//! Ring buffer errors.
//!
//! Every failure is reported synchronously and leaves the buffer untouched.
//! Each [`RingBufferError`] maps to exactly one [`ErrorCode`], a closed
//! catalogue with stable descriptions that callers can match on or log.

use std::fmt;

use thiserror::Error;

/// Result alias for ring buffer operations.
pub type Result<T> = std::result::Result<T, RingBufferError>;

/// Operation that failed to acquire its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockedOp {
    Enqueue,
    Dequeue,
    Peek,
    Clear,
    Snapshot,
}

impl LockedOp {
    /// Kind of lock the operation needs: `"write"` or `"read"`.
    #[must_use]
    pub fn lock_kind(self) -> &'static str {
        match self {
            LockedOp::Peek | LockedOp::Snapshot => "read",
            LockedOp::Enqueue | LockedOp::Dequeue | LockedOp::Clear => "write",
        }
    }
}

impl fmt::Display for LockedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockedOp::Enqueue => "enqueue",
            LockedOp::Dequeue => "dequeue",
            LockedOp::Peek => "peek",
            LockedOp::Clear => "clear",
            LockedOp::Snapshot => "snapshot",
        };
        f.pad(name)
    }
}

/// Errors raised by ring buffer construction and operations.
#[derive(Debug, Error)]
pub enum RingBufferError {
    #[error("ring buffer capacity must be greater than zero (requested {requested})")]
    InvalidCapacity { requested: usize },

    /// The lock was held elsewhere. Nothing was mutated; the caller may retry.
    #[error("failed to acquire {} lock to {op} ring buffer", .op.lock_kind())]
    LockAcquisitionFailed { op: LockedOp },

    /// The block policy refused to overwrite an unread element.
    #[error("attempted to clobber unread ring buffer data (slot {slot})")]
    ClobberAttempt { slot: usize },

    #[error("ring buffer failed: {source}")]
    UnknownFailure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RingBufferError {
    /// Wrap an unanticipated underlying fault.
    pub fn unknown(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RingBufferError::UnknownFailure {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            RingBufferError::InvalidCapacity { .. } => ErrorCode::InvalidCapacity,
            RingBufferError::LockAcquisitionFailed { op } => match op {
                LockedOp::Enqueue => ErrorCode::EnqueueLockFailed,
                LockedOp::Dequeue => ErrorCode::DequeueLockFailed,
                // Snapshot is a whole-buffer peek under the same read lock.
                LockedOp::Peek | LockedOp::Snapshot => ErrorCode::PeekLockFailed,
                LockedOp::Clear => ErrorCode::ClearLockFailed,
            },
            RingBufferError::ClobberAttempt { .. } => ErrorCode::ClobberAttempt,
            RingBufferError::UnknownFailure { .. } => ErrorCode::UnknownFailure,
        }
    }

    /// True for failures a caller can resolve by retrying later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RingBufferError::LockAcquisitionFailed { .. } | RingBufferError::ClobberAttempt { .. }
        )
    }
}

/// Closed catalogue of ring buffer failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidCapacity,
    EnqueueLockFailed,
    DequeueLockFailed,
    PeekLockFailed,
    ClearLockFailed,
    ClobberAttempt,
    UnknownFailure,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::InvalidCapacity,
        ErrorCode::EnqueueLockFailed,
        ErrorCode::DequeueLockFailed,
        ErrorCode::PeekLockFailed,
        ErrorCode::ClearLockFailed,
        ErrorCode::ClobberAttempt,
        ErrorCode::UnknownFailure,
    ];

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::InvalidCapacity => "Ring buffer capacity is less than or equal to zero",
            ErrorCode::EnqueueLockFailed => {
                "Failed to acquire write lock for enqueueing to ring buffer"
            }
            ErrorCode::DequeueLockFailed => {
                "Failed to acquire write lock for dequeueing from ring buffer"
            }
            ErrorCode::PeekLockFailed => "Failed to acquire read lock for peeking into ring buffer",
            ErrorCode::ClearLockFailed => "Failed to acquire write lock for clearing ring buffer",
            ErrorCode::ClobberAttempt => {
                "Attempted to enqueue and clobber unread ring buffer data in block mode"
            }
            ErrorCode::UnknownFailure => {
                "Ring buffer failed. Check the error source for details of the failure"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
