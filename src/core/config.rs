/*!
 * Table Configuration
 *
 * Runtime configuration for keys, pacing and acquisition order
 */

use super::limits::{
    DEFAULT_COUNT_KEY, DEFAULT_FORK_KEY, EAT_WINDOW, STARTUP_WINDOW, THINK_WINDOW,
};
use super::types::SemKey;
use crate::table::protocol::AcquisitionOrder;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time unit the startup/think/eat windows are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    /// Whole seconds (startup 60-90, think 10-20, eat 5-10)
    #[default]
    Classic,
    /// Same windows in milliseconds
    Quick,
    /// No delays at all
    Instant,
}

impl Pace {
    fn window(self, (min, max): (u64, u64)) -> DelayWindow {
        match self {
            Self::Classic => DelayWindow::new(Duration::from_secs(min), Duration::from_secs(max)),
            Self::Quick => DelayWindow::new(Duration::from_millis(min), Duration::from_millis(max)),
            Self::Instant => DelayWindow::ZERO,
        }
    }
}

/// Inclusive range a randomized delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DelayWindow {
    pub const ZERO: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Draw a uniformly distributed delay, at millisecond granularity
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min == max {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Key of the fork set
    pub fork_key: SemKey,
    /// Key of the active-philosopher counter
    pub count_key: SemKey,
    pub startup: DelayWindow,
    pub think: DelayWindow,
    pub eat: DelayWindow,
    pub order: AcquisitionOrder,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::with_pace(Pace::Classic)
    }
}

impl TableConfig {
    /// Default keys and order with the given pace
    pub fn with_pace(pace: Pace) -> Self {
        Self {
            fork_key: DEFAULT_FORK_KEY,
            count_key: DEFAULT_COUNT_KEY,
            startup: pace.window(STARTUP_WINDOW),
            think: pace.window(THINK_WINDOW),
            eat: pace.window(EAT_WINDOW),
            order: AcquisitionOrder::default(),
        }
    }

    /// Configuration for tests and simulations: millisecond delays
    pub fn quick() -> Self {
        Self::with_pace(Pace::Quick)
    }

    /// Configuration with no delays at all
    pub fn instant() -> Self {
        Self::with_pace(Pace::Instant)
    }

    pub fn order(mut self, order: AcquisitionOrder) -> Self {
        self.order = order;
        self
    }

    pub fn keys(mut self, fork_key: SemKey, count_key: SemKey) -> Self {
        self.fork_key = fork_key;
        self.count_key = count_key;
        self
    }
}
