/*!
 * Fork Acquisition Protocol
 *
 * Per-philosopher state machine:
 *
 * ```text
 * Thinking -> Acquiring{Left,Right} -> Acquiring{Right,Left} -> Eating -> Releasing
 *     ^                                                                     |
 *     +------------------------- meals < MEALS_PER_PHILOSOPHER -------------+
 *                                                                           v
 *                                                                          Done
 * ```
 *
 * The order the two Acquiring states are visited in comes from
 * `AcquisitionOrder`. Forks are held through a `ForkPairGuard`, so an
 * error anywhere between the first pick-up and the put-down returns
 * every held fork before the error propagates.
 */

use super::resources::ForkSet;
use crate::core::config::DelayWindow;
use crate::core::errors::TableResult;
use crate::core::guard::ForkPairGuard;
use crate::core::limits::{MEALS_PER_PHILOSOPHER, NUM_PHILOSOPHERS};
use crate::core::types::{ForkIndex, PhilosopherId, Side};
use crate::monitoring::{Transition, TransitionEvent, TransitionObserver};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Fork counter that is philosopher `id`'s left fork
#[inline]
pub const fn left_fork(id: PhilosopherId) -> ForkIndex {
    id % NUM_PHILOSOPHERS
}

/// Fork counter that is philosopher `id`'s right fork, shared with `id - 1`
#[inline]
pub const fn right_fork(id: PhilosopherId) -> ForkIndex {
    (id + NUM_PHILOSOPHERS - 1) % NUM_PHILOSOPHERS
}

/// Order in which a philosopher picks up its two forks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionOrder {
    /// Lower-indexed fork first. No cycle of waiters can form.
    #[default]
    Ordered,
    /// Left then right for everyone. A full ring of left-holders deadlocks;
    /// only the randomized delays make that unlikely.
    Uniform,
}

impl AcquisitionOrder {
    /// Sides in pick-up order for philosopher `id`
    pub fn sequence(self, id: PhilosopherId) -> [Side; 2] {
        match self {
            Self::Uniform => [Side::Left, Side::Right],
            Self::Ordered if left_fork(id) < right_fork(id) => [Side::Left, Side::Right],
            Self::Ordered => [Side::Right, Side::Left],
        }
    }
}

/// Logical state of one philosopher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhilosopherState {
    Thinking,
    AcquiringLeft,
    AcquiringRight,
    Eating,
    Releasing,
    Done,
}

impl PhilosopherState {
    fn acquiring(side: Side) -> Self {
        match side {
            Side::Left => Self::AcquiringLeft,
            Side::Right => Self::AcquiringRight,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Delays and order the protocol runs with
#[derive(Debug, Clone, Copy)]
pub struct ProtocolTiming {
    pub think: DelayWindow,
    pub eat: DelayWindow,
    pub order: AcquisitionOrder,
}

/// One philosopher's run through the protocol
pub struct ForkProtocol<'a> {
    philosopher: PhilosopherId,
    forks: &'a ForkSet,
    timing: ProtocolTiming,
    observer: &'a dyn TransitionObserver,
    state: PhilosopherState,
    meals: u32,
    pair: Option<ForkPairGuard<'a>>,
}

impl<'a> ForkProtocol<'a> {
    pub fn new(
        philosopher: PhilosopherId,
        forks: &'a ForkSet,
        timing: ProtocolTiming,
        observer: &'a dyn TransitionObserver,
    ) -> Self {
        Self {
            philosopher,
            forks,
            timing,
            observer,
            state: PhilosopherState::Thinking,
            meals: 0,
            pair: None,
        }
    }

    #[inline]
    pub fn state(&self) -> PhilosopherState {
        self.state
    }

    #[inline]
    pub fn meals(&self) -> u32 {
        self.meals
    }

    fn emit(&self, transition: Transition) {
        self.observer
            .on_transition(&TransitionEvent::new(self.philosopher, transition));
    }

    fn pause(duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    /// Perform the current state's action and move to the next state
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TableResult<PhilosopherState> {
        let [first, second] = self.timing.order.sequence(self.philosopher);

        let next = match self.state {
            PhilosopherState::Thinking => {
                let duration = self.timing.think.sample(rng);
                self.emit(Transition::Thinking { duration });
                Self::pause(duration);
                PhilosopherState::acquiring(first)
            }
            PhilosopherState::AcquiringLeft | PhilosopherState::AcquiringRight => {
                let side = if self.state == PhilosopherState::AcquiringLeft {
                    Side::Left
                } else {
                    Side::Right
                };
                let mut pair = self
                    .pair
                    .take()
                    .unwrap_or_else(|| ForkPairGuard::new(self.forks, self.philosopher));
                // On error `pair` drops here and puts back what it holds
                let fork = pair.pick_up(side)?;
                self.emit(Transition::PickedUp { side, fork });

                let done = pair.holds_both();
                self.pair = Some(pair);
                if done {
                    PhilosopherState::Eating
                } else {
                    PhilosopherState::acquiring(second)
                }
            }
            PhilosopherState::Eating => {
                let duration = self.timing.eat.sample(rng);
                let meal = self.meals + 1;
                self.emit(Transition::Eating { duration, meal });
                Self::pause(duration);
                self.meals = meal;
                PhilosopherState::Releasing
            }
            PhilosopherState::Releasing => {
                if let Some(pair) = self.pair.take() {
                    pair.put_down()?;
                }
                self.emit(Transition::PutDown { meal: self.meals });
                if self.meals < MEALS_PER_PHILOSOPHER {
                    PhilosopherState::Thinking
                } else {
                    PhilosopherState::Done
                }
            }
            PhilosopherState::Done => PhilosopherState::Done,
        };

        self.state = next;
        Ok(next)
    }

    /// Step until `Done`; returns the number of meals eaten
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TableResult<u32> {
        while !self.state.is_done() {
            self.step(rng)?;
        }
        Ok(self.meals)
    }
}
