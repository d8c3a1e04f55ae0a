/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::types::{ForkIndex, PhilosopherId, SemKey, Side};
use miette::Diagnostic;
use thiserror::Error;

// Re-export SemError from the semaphore module
pub use crate::ipc::semaphore::SemError;

/// Table result alias
pub type TableResult<T> = Result<T, TableError>;

/// Fatal errors of the dining-table protocol
///
/// Every variant except `InvalidParticipant`, `Launch` and `NotSupported`
/// wraps a failed kernel-level semaphore operation.
#[derive(Error, Debug, Diagnostic)]
pub enum TableError {
    #[error("Failed to create semaphore set {key} ({count} counters)")]
    #[diagnostic(
        code(table::resource_creation),
        help("The kernel could not allocate the set. Check permissions and `ipcs -s`.")
    )]
    ResourceCreation {
        key: SemKey,
        count: usize,
        #[source]
        source: SemError,
    },

    #[error("Failed to initialize counter {index} of semaphore set {key}")]
    #[diagnostic(code(table::initialization))]
    Initialization {
        key: SemKey,
        index: usize,
        #[source]
        source: SemError,
    },

    #[error("Philosopher {philosopher} failed to pick up {side} fork {fork}")]
    #[diagnostic(
        code(table::acquisition),
        help("The fork set may have been removed by another process.")
    )]
    Acquisition {
        philosopher: PhilosopherId,
        side: Side,
        fork: ForkIndex,
        #[source]
        source: SemError,
    },

    #[error("Philosopher {philosopher} failed to put down {side} fork {fork}")]
    #[diagnostic(code(table::release))]
    Release {
        philosopher: PhilosopherId,
        side: Side,
        fork: ForkIndex,
        #[source]
        source: SemError,
    },

    #[error("Philosopher {philosopher} failed to decrement the philosopher count")]
    #[diagnostic(code(table::decrement))]
    Decrement {
        philosopher: PhilosopherId,
        #[source]
        source: SemError,
    },

    #[error("Philosopher {philosopher} failed to read the philosopher count")]
    #[diagnostic(code(table::count_read))]
    CountRead {
        philosopher: PhilosopherId,
        #[source]
        source: SemError,
    },

    #[error("Failed to remove semaphore set {key}")]
    #[diagnostic(
        code(table::teardown),
        help("The set may already have been removed. Leftovers can be cleared with `philosopher cleanup`.")
    )]
    Teardown {
        key: SemKey,
        #[source]
        source: SemError,
    },

    #[error("Invalid philosopher id {id}: must be below {seats}")]
    #[diagnostic(code(table::invalid_participant))]
    InvalidParticipant { id: usize, seats: usize },

    #[error("Failed to launch philosopher {philosopher}: {message}")]
    #[diagnostic(code(table::launch))]
    Launch {
        philosopher: PhilosopherId,
        message: String,
    },

    #[error("Not supported: {0}")]
    #[diagnostic(
        code(table::not_supported),
        help("Kernel semaphores need Linux. `philosopher simulate` runs in-process anywhere.")
    )]
    NotSupported(String),
}

impl TableError {
    /// Philosopher the error is attributed to, if any
    pub fn philosopher(&self) -> Option<PhilosopherId> {
        match self {
            Self::Acquisition { philosopher, .. }
            | Self::Release { philosopher, .. }
            | Self::Decrement { philosopher, .. }
            | Self::CountRead { philosopher, .. }
            | Self::Launch { philosopher, .. } => Some(*philosopher),
            Self::InvalidParticipant { id, .. } => Some(*id),
            Self::ResourceCreation { .. }
            | Self::Initialization { .. }
            | Self::Teardown { .. }
            | Self::NotSupported(_) => None,
        }
    }

    /// Underlying semaphore error, if this is a kernel-level failure
    pub fn sem_error(&self) -> Option<&SemError> {
        match self {
            Self::ResourceCreation { source, .. }
            | Self::Initialization { source, .. }
            | Self::Acquisition { source, .. }
            | Self::Release { source, .. }
            | Self::Decrement { source, .. }
            | Self::CountRead { source, .. }
            | Self::Teardown { source, .. } => Some(source),
            Self::InvalidParticipant { .. } | Self::Launch { .. } | Self::NotSupported(_) => None,
        }
    }
}
