/*!
 * Philosopher Lifecycle
 *
 * Seat -> staggered start -> protocol to completion -> leave the table ->
 * tear down the shared sets if this was the last philosopher.
 */

use super::protocol::{ForkProtocol, ProtocolTiming};
use super::tracker::Departure;
use super::Table;
use crate::core::config::TableConfig;
use crate::core::errors::{TableError, TableResult};
use crate::core::limits::{NUM_PHILOSOPHERS, SEED_MULTIPLIER};
use crate::core::types::PhilosopherId;
use crate::ipc::semaphore::SemaphoreBackend;
use crate::monitoring::{Transition, TransitionEvent, TransitionObserver};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info_span};

/// RNG seed for a philosopher starting at `now_secs`
///
/// Distinct per identity for the same instant, identity 0 included.
pub fn seed_for(id: PhilosopherId, now_secs: u64) -> u64 {
    SEED_MULTIPLIER
        .wrapping_mul(now_secs)
        .wrapping_mul(id as u64 + 1)
}

/// Reject identities outside the table
pub fn validate_id(id: usize) -> TableResult<PhilosopherId> {
    if id < NUM_PHILOSOPHERS {
        Ok(id)
    } else {
        Err(TableError::InvalidParticipant {
            id,
            seats: NUM_PHILOSOPHERS,
        })
    }
}

/// What a philosopher reports after leaving the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantReport {
    pub philosopher: PhilosopherId,
    pub meals: u32,
    pub departure: Departure,
    /// Whether this philosopher removed the shared sets
    pub tore_down: bool,
    pub elapsed_ms: u64,
}

/// One seated participant
pub struct Philosopher {
    id: PhilosopherId,
    table: Table,
    config: TableConfig,
    rng: StdRng,
    observer: Arc<dyn TransitionObserver>,
}

impl Philosopher {
    /// Join the table as `id`; identity 0 initializes both sets
    pub fn seat(
        backend: Arc<dyn SemaphoreBackend>,
        config: TableConfig,
        id: usize,
        observer: Arc<dyn TransitionObserver>,
    ) -> TableResult<Self> {
        let id = validate_id(id)?;
        let table = Table::join(backend, &config, id)?;
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Ok(Self {
            id,
            table,
            config,
            rng: StdRng::seed_from_u64(seed_for(id, now_secs)),
            observer,
        })
    }

    /// Replace the time-derived RNG with a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    /// Eat every meal, leave, and tear down if last
    pub fn run(mut self) -> TableResult<ParticipantReport> {
        let span = info_span!("philosopher", id = self.id);
        let _entered = span.enter();
        let started = Instant::now();

        let startup = self.config.startup.sample(&mut self.rng);
        self.emit(Transition::Seated { startup });
        if !startup.is_zero() {
            thread::sleep(startup);
        }

        let timing = ProtocolTiming {
            think: self.config.think,
            eat: self.config.eat,
            order: self.config.order,
        };
        let meals = {
            let mut protocol =
                ForkProtocol::new(self.id, self.table.forks(), timing, self.observer.as_ref());
            protocol.run(&mut self.rng)?
        };

        let departure = self.table.counter().depart(self.id)?;
        let tore_down = match departure {
            Departure::Last => {
                self.emit(Transition::LastToEat);
                self.table.teardown()?;
                true
            }
            Departure::Remaining => {
                self.emit(Transition::DoneEating);
                debug!(
                    philosopher = self.id,
                    remaining = ?self.table.counter().read_value(self.id).ok(),
                    "left the table"
                );
                false
            }
        };

        Ok(ParticipantReport {
            philosopher: self.id,
            meals,
            departure,
            tore_down,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn emit(&self, transition: Transition) {
        self.observer
            .on_transition(&TransitionEvent::new(self.id, transition));
    }
}
