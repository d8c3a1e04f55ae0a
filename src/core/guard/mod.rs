/*!
 * RAII Resource Guards
 *
 * Scoped ownership of semaphore-backed resources with automatic release.
 *
 * ## Guard Types
 *
 * - **ForkPairGuard**: the two forks a philosopher holds while eating.
 *   Any fork still held when the guard goes out of scope, on success or
 *   on an error path, is put back.
 */

mod fork;
mod traits;

pub use fork::ForkPairGuard;
pub use traits::{Guard, GuardDrop};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub philosopher: Option<crate::core::types::PhilosopherId>,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            philosopher: None,
        }
    }

    #[inline]
    pub fn with_philosopher(mut self, philosopher: crate::core::types::PhilosopherId) -> Self {
        self.philosopher = Some(philosopher);
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
