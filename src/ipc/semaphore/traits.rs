/*!
 * Semaphore Traits
 * Counting-semaphore set abstraction shared by the kernel and in-process backends
 */

use super::types::SemResult;
use crate::core::types::{SemKey, SemSetId, SemValue};

/// A namespace of named counting-semaphore sets
///
/// Every operation takes the set handle explicitly; no backend keeps an
/// implicit "current" set.
#[cfg_attr(test, mockall::automock)]
pub trait SemaphoreBackend: Send + Sync {
    /// Get the set named `key`, creating it with `count` zeroed counters if absent
    fn ensure(&self, key: SemKey, count: usize) -> SemResult<SemSetId>;

    /// Look up an existing set without creating it
    fn lookup(&self, key: SemKey) -> SemResult<Option<SemSetId>>;

    /// Overwrite one counter
    fn set_value(&self, set: SemSetId, index: usize, value: SemValue) -> SemResult<()>;

    /// Read one counter
    fn value(&self, set: SemSetId, index: usize) -> SemResult<SemValue>;

    /// P: decrement by one, blocking while the counter is zero
    fn acquire(&self, set: SemSetId, index: usize) -> SemResult<()>;

    /// P that also reports whether this decrement brought the counter to zero
    ///
    /// The decrement and the zero test are one atomic step.
    fn acquire_and_test_zero(&self, set: SemSetId, index: usize) -> SemResult<bool>;

    /// V: increment by one, waking a blocked waiter if any
    fn release(&self, set: SemSetId, index: usize) -> SemResult<()>;

    /// Destroy the set; blocked waiters fail with `Removed`
    fn remove(&self, set: SemSetId) -> SemResult<()>;

    /// Short backend name for logging
    fn name(&self) -> &'static str;
}
