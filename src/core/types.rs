/*!
 * Core Types
 * Common types used across the table
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identity, in `0..NUM_PHILOSOPHERS`
pub type PhilosopherId = usize;

/// Index of a fork counter inside the fork set
pub type ForkIndex = usize;

/// Raw counter value as stored by the semaphore backend
pub type SemValue = i32;

/// Well-known identifier two unrelated processes use to find the same semaphore set
///
/// Equivalent of a System V `key_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemKey(pub i32);

impl SemKey {
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for SemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SemKey {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Handle to a semaphore set returned by a backend's `ensure`
///
/// Only meaningful to the backend that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemSetId(pub i32);

impl fmt::Display for SemSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of a philosopher's two forks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
