/*!
 * Participant Count Tracker
 *
 * A single shared counter, initialized to the number of philosophers,
 * that each philosopher decrements once when it leaves the table. The
 * philosopher whose decrement brings it to zero owns teardown.
 */

use super::resources::ResourceSet;
use crate::core::errors::{TableError, TableResult};
use crate::core::limits::NUM_PHILOSOPHERS;
use crate::core::types::{PhilosopherId, SemKey, SemValue};
use crate::ipc::semaphore::SemaphoreBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const COUNTER_INDEX: usize = 0;

/// Outcome of leaving the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Departure {
    /// This departure brought the counter to zero
    Last,
    /// Others were still seated
    Remaining,
}

impl Departure {
    #[inline]
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Last)
    }
}

/// Active-philosopher counter
#[derive(Debug)]
pub struct ParticipantCounter {
    set: ResourceSet,
}

impl ParticipantCounter {
    pub fn ensure(backend: Arc<dyn SemaphoreBackend>, key: SemKey) -> TableResult<Self> {
        ResourceSet::ensure(backend, key, 1, NUM_PHILOSOPHERS as SemValue).map(|set| Self { set })
    }

    /// Set the counter to the number of philosophers
    pub fn initialize_once(&self) -> TableResult<()> {
        self.set.initialize_once()
    }

    /// Atomically decrement by one
    pub fn decrement(&self, philosopher: PhilosopherId) -> TableResult<()> {
        self.set
            .backend()
            .acquire(self.set.id(), COUNTER_INDEX)
            .map_err(|source| TableError::Decrement {
                philosopher,
                source,
            })
    }

    /// Atomically read the current value
    pub fn read_value(&self, philosopher: PhilosopherId) -> TableResult<SemValue> {
        self.set
            .value(COUNTER_INDEX)
            .map_err(|source| TableError::CountRead {
                philosopher,
                source,
            })
    }

    /// Decrement and learn, in the same atomic step, whether this was the last departure
    ///
    /// At most one caller per counter lifetime gets `Departure::Last`,
    /// even when several philosophers finish at the same moment.
    pub fn depart(&self, philosopher: PhilosopherId) -> TableResult<Departure> {
        let reached_zero = self
            .set
            .backend()
            .acquire_and_test_zero(self.set.id(), COUNTER_INDEX)
            .map_err(|source| TableError::Decrement {
                philosopher,
                source,
            })?;

        if reached_zero {
            debug!(philosopher, "philosopher count reached zero");
            Ok(Departure::Last)
        } else {
            Ok(Departure::Remaining)
        }
    }

    pub fn key(&self) -> SemKey {
        self.set.key()
    }

    pub fn destroy(self) -> TableResult<()> {
        self.set.destroy()
    }
}
