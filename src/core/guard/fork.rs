/*!
 * Fork Pair Guard
 *
 * Scoped ownership of a philosopher's two forks. Forks are picked up one
 * at a time in whatever order the caller chooses; whatever is still held
 * when the guard is dropped is put back.
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::errors::{TableError, TableResult};
use crate::core::types::{ForkIndex, PhilosopherId, Side};
use crate::table::protocol::{left_fork, right_fork};
use crate::table::resources::ForkSet;
use tracing::{error, trace};

/// Left and right fork slots; `true` while held
#[derive(Debug, Default, Clone, Copy)]
struct Held {
    left: bool,
    right: bool,
}

impl Held {
    fn get(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn set(&mut self, side: Side, held: bool) {
        match side {
            Side::Left => self.left = held,
            Side::Right => self.right = held,
        }
    }
}

/// RAII guard over a philosopher's left and right forks
///
/// # Example
///
/// ```ignore
/// let mut pair = ForkPairGuard::new(&forks, id);
/// pair.pick_up(Side::Left)?;
/// pair.pick_up(Side::Right)?; // on error the left fork is put back
/// // eat...
/// pair.put_down()?;
/// ```
pub struct ForkPairGuard<'a> {
    forks: &'a ForkSet,
    philosopher: PhilosopherId,
    held: Held,
    metadata: GuardMetadata,
}

impl<'a> ForkPairGuard<'a> {
    /// Create a guard holding nothing yet
    pub fn new(forks: &'a ForkSet, philosopher: PhilosopherId) -> Self {
        Self {
            forks,
            philosopher,
            held: Held::default(),
            metadata: GuardMetadata::new("fork_pair").with_philosopher(philosopher),
        }
    }

    /// Fork counter index for one side of this philosopher
    #[inline]
    pub fn fork_index(&self, side: Side) -> ForkIndex {
        match side {
            Side::Left => left_fork(self.philosopher),
            Side::Right => right_fork(self.philosopher),
        }
    }

    #[inline]
    pub fn holds_both(&self) -> bool {
        self.held.left && self.held.right
    }

    /// Block until the fork on `side` is available and take it
    ///
    /// Picking up a fork that is already held is a no-op.
    pub fn pick_up(&mut self, side: Side) -> TableResult<ForkIndex> {
        let fork = self.fork_index(side);
        if self.held.get(side) {
            return Ok(fork);
        }
        self.forks
            .acquire(fork)
            .map_err(|source| TableError::Acquisition {
                philosopher: self.philosopher,
                side,
                fork,
                source,
            })?;
        self.held.set(side, true);
        trace!(philosopher = self.philosopher, %side, fork, "fork held");
        Ok(fork)
    }

    fn put_back(&mut self, side: Side) -> TableResult<()> {
        if !self.held.get(side) {
            return Ok(());
        }
        let fork = self.fork_index(side);
        self.forks
            .release(fork)
            .map_err(|source| TableError::Release {
                philosopher: self.philosopher,
                side,
                fork,
                source,
            })?;
        self.held.set(side, false);
        Ok(())
    }

    /// Put down the left fork, then the right fork
    ///
    /// On error, a fork that is still held is put back when the guard drops.
    pub fn put_down(mut self) -> TableResult<()> {
        self.put_back(Side::Left)?;
        self.put_back(Side::Right)
    }
}

impl Guard for ForkPairGuard<'_> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.held.left || self.held.right
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.is_active() {
            return Err(GuardError::AlreadyReleased);
        }
        let left = self.put_back(Side::Left);
        let right = self.put_back(Side::Right);
        left.and(right)
            .map_err(|e| GuardError::OperationFailed(e.to_string()))
    }
}

impl GuardDrop for ForkPairGuard<'_> {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                error!(
                    resource = self.resource_type(),
                    philosopher = ?self.metadata.philosopher,
                    held_us = self.metadata.lifetime_micros(),
                    error = %e,
                    "fork pair guard drop failed"
                );
            }
        }
    }
}

impl Drop for ForkPairGuard<'_> {
    fn drop(&mut self) {
        self.on_drop();
    }
}
