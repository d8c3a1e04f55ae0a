/*!
 * Semaphore Types
 * Common types and errors for counting-semaphore backends
 */

use crate::core::types::{SemSetId, SemValue};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Semaphore backend result
pub type SemResult<T> = Result<T, SemError>;

/// Kernel-level operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemOp {
    Get,
    Acquire,
    Release,
    SetValue,
    GetValue,
    Remove,
}

impl SemOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "semget",
            Self::Acquire | Self::Release => "semop",
            Self::SetValue => "semctl(SETVAL)",
            Self::GetValue => "semctl(GETVAL)",
            Self::Remove => "semctl(IPC_RMID)",
        }
    }
}

impl fmt::Display for SemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counting-semaphore error types
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SemError {
    /// The kernel rejected the call
    #[error("{op} failed: {message} (errno {code})")]
    #[diagnostic(
        code(sem::os),
        help("Check `ipcs -s` for stale sets and the semaphore limits in /proc/sys/kernel/sem.")
    )]
    Os {
        op: SemOp,
        code: i32,
        message: String,
    },

    /// Set id does not (or no longer) exist
    #[error("Semaphore set {0} not found")]
    #[diagnostic(code(sem::not_found))]
    NotFound(SemSetId),

    /// Set was removed while the caller was blocked on it
    #[error("Semaphore set {0} was removed while waiting")]
    #[diagnostic(code(sem::removed))]
    Removed(SemSetId),

    #[error("Semaphore index {index} out of range for set of {count}")]
    #[diagnostic(code(sem::index_out_of_range))]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Semaphore value {value} outside 0..={max}")]
    #[diagnostic(code(sem::overflow))]
    Overflow { value: SemValue, max: SemValue },
}

impl SemError {
    pub fn os(op: SemOp, code: i32, message: impl Into<String>) -> Self {
        Self::Os {
            op,
            code,
            message: message.into(),
        }
    }
}
