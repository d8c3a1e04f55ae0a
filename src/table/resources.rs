/*!
 * Resource Set Manager
 *
 * Locates (creating if absent) the named semaphore sets the table runs
 * on, sets their starting values, and removes them at the end.
 */

use crate::core::errors::{TableError, TableResult};
use crate::core::limits::{FORK_AVAILABLE, NUM_PHILOSOPHERS};
use crate::core::types::{ForkIndex, SemKey, SemSetId, SemValue};
use crate::ipc::semaphore::{SemResult, SemaphoreBackend};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle to one named semaphore set
///
/// Obtained through `ensure` and passed explicitly to every operation.
/// `destroy` consumes the handle.
pub struct ResourceSet {
    backend: Arc<dyn SemaphoreBackend>,
    id: SemSetId,
    key: SemKey,
    count: usize,
    initial_value: SemValue,
}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSet")
            .field("backend", &self.backend.name())
            .field("id", &self.id)
            .field("key", &self.key)
            .field("count", &self.count)
            .field("initial_value", &self.initial_value)
            .finish()
    }
}

impl ResourceSet {
    /// Get or create the set named `key` with `count` counters
    ///
    /// `initial_value` is what `initialize_once` will write; the counters
    /// are not touched here.
    pub fn ensure(
        backend: Arc<dyn SemaphoreBackend>,
        key: SemKey,
        count: usize,
        initial_value: SemValue,
    ) -> TableResult<Self> {
        let id = backend
            .ensure(key, count)
            .map_err(|source| TableError::ResourceCreation { key, count, source })?;
        debug!(key = %key, set = %id, count, backend = backend.name(), "semaphore set ready");
        Ok(Self {
            backend,
            id,
            key,
            count,
            initial_value,
        })
    }

    /// Write the initial value into every counter
    ///
    /// Only the designated initializer calls this, before anyone acquires.
    pub fn initialize_once(&self) -> TableResult<()> {
        let values = vec![self.initial_value; self.count];
        self.initialize_with(&values)
    }

    /// Write explicit starting values, one per counter
    pub fn initialize_with(&self, values: &[SemValue]) -> TableResult<()> {
        for (index, &value) in values.iter().enumerate() {
            self.backend
                .set_value(self.id, index, value)
                .map_err(|source| TableError::Initialization {
                    key: self.key,
                    index,
                    source,
                })?;
        }
        info!(key = %self.key, values = ?values, "semaphore set initialized");
        Ok(())
    }

    /// Remove the set from the backend
    pub fn destroy(self) -> TableResult<()> {
        self.backend
            .remove(self.id)
            .map_err(|source| TableError::Teardown {
                key: self.key,
                source,
            })?;
        info!(key = %self.key, set = %self.id, "semaphore set removed");
        Ok(())
    }

    #[inline]
    pub fn value(&self, index: usize) -> SemResult<SemValue> {
        self.backend.value(self.id, index)
    }

    /// Snapshot of every counter
    pub fn values(&self) -> SemResult<Vec<SemValue>> {
        (0..self.count).map(|i| self.value(i)).collect()
    }

    #[inline]
    pub fn id(&self) -> SemSetId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> SemKey {
        self.key
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn backend(&self) -> &dyn SemaphoreBackend {
        self.backend.as_ref()
    }
}

/// The ring of fork counters, one per seat
#[derive(Debug)]
pub struct ForkSet {
    set: ResourceSet,
}

impl ForkSet {
    pub fn ensure(backend: Arc<dyn SemaphoreBackend>, key: SemKey) -> TableResult<Self> {
        ResourceSet::ensure(backend, key, NUM_PHILOSOPHERS, FORK_AVAILABLE).map(|set| Self { set })
    }

    /// Mark every fork available
    pub fn initialize_once(&self) -> TableResult<()> {
        self.set.initialize_once()
    }

    /// Block until fork `index` is free and take it
    #[inline]
    pub fn acquire(&self, index: ForkIndex) -> SemResult<()> {
        self.set.backend().acquire(self.set.id(), index)
    }

    /// Put fork `index` back
    #[inline]
    pub fn release(&self, index: ForkIndex) -> SemResult<()> {
        self.set.backend().release(self.set.id(), index)
    }

    #[inline]
    pub fn value(&self, index: ForkIndex) -> SemResult<SemValue> {
        self.set.value(index)
    }

    pub fn values(&self) -> SemResult<Vec<SemValue>> {
        self.set.values()
    }

    pub fn key(&self) -> SemKey {
        self.set.key()
    }

    pub fn destroy(self) -> TableResult<()> {
        self.set.destroy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::semaphore::{MemoryBackend, SemError};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ensure_does_not_initialize() {
        let backend = Arc::new(MemoryBackend::new());
        let forks = ForkSet::ensure(backend, SemKey(123)).unwrap();
        assert_eq!(forks.values().unwrap(), vec![0; NUM_PHILOSOPHERS]);

        forks.initialize_once().unwrap();
        assert_eq!(forks.values().unwrap(), vec![1; NUM_PHILOSOPHERS]);
    }

    #[test]
    fn test_initialize_with_explicit_values() {
        let backend = Arc::new(MemoryBackend::new());
        let set = ResourceSet::ensure(backend, SemKey(9), 3, 0).unwrap();
        set.initialize_with(&[1, 0, 2]).unwrap();
        assert_eq!(set.values().unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_initialize_failure_names_counter() {
        let backend = Arc::new(MemoryBackend::new());
        let set = ResourceSet::ensure(backend, SemKey(9), 2, 0).unwrap();
        let err = set.initialize_with(&[1, -4]).unwrap_err();
        assert!(matches!(
            err,
            TableError::Initialization { index: 1, source: SemError::Overflow { .. }, .. }
        ));
    }

    #[test]
    fn test_destroy_then_ensure_is_fresh() {
        let backend = MemoryBackend::new();
        let shared: Arc<dyn SemaphoreBackend> = Arc::new(backend.clone());

        let forks = ForkSet::ensure(shared.clone(), SemKey(123)).unwrap();
        forks.initialize_once().unwrap();
        forks.acquire(0).unwrap();
        forks.destroy().unwrap();
        assert_eq!(backend.set_count(), 0);

        let again = ForkSet::ensure(shared, SemKey(123)).unwrap();
        assert_eq!(again.values().unwrap(), vec![0; NUM_PHILOSOPHERS]);
        again.initialize_once().unwrap();
        assert_eq!(again.values().unwrap(), vec![1; NUM_PHILOSOPHERS]);
    }

    #[test]
    fn test_destroy_of_removed_set_is_teardown_error() {
        let backend = MemoryBackend::new();
        let shared: Arc<dyn SemaphoreBackend> = Arc::new(backend.clone());
        let a = ResourceSet::ensure(shared.clone(), SemKey(5), 1, 1).unwrap();
        let b = ResourceSet::ensure(shared, SemKey(5), 1, 1).unwrap();
        assert_eq!(a.id(), b.id());

        a.destroy().unwrap();
        assert!(matches!(b.destroy(), Err(TableError::Teardown { .. })));
    }
}
