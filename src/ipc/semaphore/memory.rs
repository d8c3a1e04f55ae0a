/*!
 * In-Process Semaphore Backend
 *
 * Key-addressed semaphore sets living in this process, with the same
 * observable semantics as System V sets: fresh sets start at zero,
 * `ensure` on a known key returns the existing set, and removal wakes
 * blocked waiters with an error.
 */

use super::traits::SemaphoreBackend;
use super::types::{SemError, SemResult};
use crate::core::limits::SEM_VALUE_MAX;
use crate::core::types::{SemKey, SemSetId, SemValue};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::debug;

struct Counters {
    values: Vec<SemValue>,
    removed: bool,
}

/// One semaphore set
///
/// A single condvar serves every counter of the set; waiters re-check
/// their own counter after each wakeup.
struct SemSet {
    counters: Mutex<Counters>,
    changed: Condvar,
}

impl SemSet {
    fn new(count: usize) -> Self {
        Self {
            counters: Mutex::new(Counters {
                values: vec![0; count],
                removed: false,
            }),
            changed: Condvar::new(),
        }
    }
}

fn check_index(counters: &Counters, index: usize) -> SemResult<()> {
    if index >= counters.values.len() {
        return Err(SemError::IndexOutOfRange {
            index,
            count: counters.values.len(),
        });
    }
    Ok(())
}

/// In-process semaphore backend
///
/// Cloning shares the namespace, so clones handed to several threads
/// rendezvous on the same sets the way separate processes do through
/// the kernel.
#[derive(Clone)]
pub struct MemoryBackend {
    keys: Arc<DashMap<SemKey, SemSetId, RandomState>>,
    sets: Arc<DashMap<SemSetId, Arc<SemSet>, RandomState>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(DashMap::with_hasher(RandomState::new())),
            sets: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    /// Number of live sets
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    fn set(&self, id: SemSetId) -> SemResult<Arc<SemSet>> {
        self.sets
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SemError::NotFound(id))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SemaphoreBackend for MemoryBackend {
    fn ensure(&self, key: SemKey, count: usize) -> SemResult<SemSetId> {
        let entry = self.keys.entry(key).or_insert_with(|| {
            let id = SemSetId(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.sets.insert(id, Arc::new(SemSet::new(count)));
            debug!(key = %key, set = %id, count, "created in-process semaphore set");
            id
        });
        let id = *entry.value();
        drop(entry);

        // Matches semget: an existing set must be at least as large as requested
        let set = self.set(id)?;
        let len = set.counters.lock().values.len();
        if count > len {
            return Err(SemError::IndexOutOfRange {
                index: count - 1,
                count: len,
            });
        }
        Ok(id)
    }

    fn lookup(&self, key: SemKey) -> SemResult<Option<SemSetId>> {
        Ok(self.keys.get(&key).map(|entry| *entry.value()))
    }

    fn set_value(&self, set: SemSetId, index: usize, value: SemValue) -> SemResult<()> {
        if !(0..=SEM_VALUE_MAX).contains(&value) {
            return Err(SemError::Overflow {
                value,
                max: SEM_VALUE_MAX,
            });
        }
        let sem = self.set(set)?;
        let mut counters = sem.counters.lock();
        check_index(&counters, index)?;
        counters.values[index] = value;
        drop(counters);
        sem.changed.notify_all();
        Ok(())
    }

    fn value(&self, set: SemSetId, index: usize) -> SemResult<SemValue> {
        let sem = self.set(set)?;
        let counters = sem.counters.lock();
        check_index(&counters, index)?;
        Ok(counters.values[index])
    }

    fn acquire(&self, set: SemSetId, index: usize) -> SemResult<()> {
        self.acquire_and_test_zero(set, index).map(|_| ())
    }

    fn acquire_and_test_zero(&self, set: SemSetId, index: usize) -> SemResult<bool> {
        let sem = self.set(set)?;
        let mut counters = sem.counters.lock();
        check_index(&counters, index)?;
        loop {
            if counters.removed {
                return Err(SemError::Removed(set));
            }
            if counters.values[index] > 0 {
                counters.values[index] -= 1;
                return Ok(counters.values[index] == 0);
            }
            sem.changed.wait(&mut counters);
        }
    }

    fn release(&self, set: SemSetId, index: usize) -> SemResult<()> {
        let sem = self.set(set)?;
        let mut counters = sem.counters.lock();
        check_index(&counters, index)?;
        if counters.removed {
            return Err(SemError::NotFound(set));
        }
        if counters.values[index] >= SEM_VALUE_MAX {
            return Err(SemError::Overflow {
                value: counters.values[index] + 1,
                max: SEM_VALUE_MAX,
            });
        }
        counters.values[index] += 1;
        drop(counters);
        sem.changed.notify_all();
        Ok(())
    }

    fn remove(&self, set: SemSetId) -> SemResult<()> {
        let (_, sem) = self.sets.remove(&set).ok_or(SemError::NotFound(set))?;
        self.keys.retain(|_, id| *id != set);

        sem.counters.lock().removed = true;
        sem.changed.notify_all();
        debug!(set = %set, "removed in-process semaphore set");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
