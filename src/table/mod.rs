/*!
 * Dining Table
 *
 * The fork ring and the active-philosopher counter, plus the protocol
 * each philosopher runs against them.
 */

pub mod philosopher;
pub mod protocol;
pub mod resources;
pub mod tracker;

pub use philosopher::{ParticipantReport, Philosopher};
pub use protocol::{AcquisitionOrder, ForkProtocol, PhilosopherState};
pub use resources::{ForkSet, ResourceSet};
pub use tracker::{Departure, ParticipantCounter};

use crate::core::config::TableConfig;
use crate::core::errors::{TableError, TableResult};
use crate::core::limits::INITIALIZER;
use crate::core::types::PhilosopherId;
use crate::ipc::semaphore::SemaphoreBackend;
use std::sync::Arc;
use tracing::info;

/// Both shared sets as seen by one philosopher
#[derive(Debug)]
pub struct Table {
    forks: ForkSet,
    counter: ParticipantCounter,
}

impl Table {
    /// Locate both sets; the initializer also sets their starting values
    pub fn join(
        backend: Arc<dyn SemaphoreBackend>,
        config: &TableConfig,
        philosopher: PhilosopherId,
    ) -> TableResult<Self> {
        let forks = ForkSet::ensure(backend.clone(), config.fork_key)?;
        let counter = ParticipantCounter::ensure(backend, config.count_key)?;

        if philosopher == INITIALIZER {
            forks.initialize_once()?;
            counter.initialize_once()?;
            info!(philosopher, "table set");
        }

        Ok(Self { forks, counter })
    }

    #[inline]
    pub fn forks(&self) -> &ForkSet {
        &self.forks
    }

    #[inline]
    pub fn counter(&self) -> &ParticipantCounter {
        &self.counter
    }

    /// Remove the fork set, then the counter
    pub fn teardown(self) -> TableResult<()> {
        self.forks.destroy()?;
        self.counter.destroy()
    }
}

/// Remove whatever sets exist under the configured keys
///
/// Used to recover from a run that crashed before teardown. Keys with no
/// set are skipped; returns how many sets were removed.
pub fn clear_leftovers(backend: &dyn SemaphoreBackend, config: &TableConfig) -> TableResult<usize> {
    let mut removed = 0;
    for key in [config.fork_key, config.count_key] {
        let existing = backend
            .lookup(key)
            .map_err(|source| TableError::Teardown { key, source })?;
        if let Some(set) = existing {
            backend
                .remove(set)
                .map_err(|source| TableError::Teardown { key, source })?;
            info!(key = %key, set = %set, "removed leftover semaphore set");
            removed += 1;
        }
    }
    Ok(removed)
}
