/*!
 * Table Limits and Constants
 *
 * Centralized location for the fixed shape of the table and the
 * System V parameters every participant must agree on.
 */

use super::types::{PhilosopherId, SemKey, SemValue};

// =============================================================================
// TABLE SHAPE
// =============================================================================

/// Number of philosophers, and therefore forks, around the table
pub const NUM_PHILOSOPHERS: usize = 5;

/// Successful meals each philosopher completes before leaving
pub const MEALS_PER_PHILOSOPHER: u32 = 3;

/// Identity that initializes both semaphore sets
pub const INITIALIZER: PhilosopherId = 0;

/// Initial value of each fork counter (available)
pub const FORK_AVAILABLE: SemValue = 1;

// =============================================================================
// WELL-KNOWN KEYS
// =============================================================================

/// Default key of the fork set
pub const DEFAULT_FORK_KEY: SemKey = SemKey::new(123);

/// Default key of the active-philosopher counter
pub const DEFAULT_COUNT_KEY: SemKey = SemKey::new(234);

// =============================================================================
// SYSTEM V PARAMETERS
// =============================================================================

/// Owner read/write only
pub const SEM_PERMISSIONS: i32 = 0o600;

/// Largest value a System V semaphore can hold [LINUX-COMPAT]
pub const SEM_VALUE_MAX: SemValue = 32767;

// =============================================================================
// TIMING WINDOWS (inclusive, in pace units)
// =============================================================================

/// Staggered start before the first think
pub const STARTUP_WINDOW: (u64, u64) = (60, 90);

pub const THINK_WINDOW: (u64, u64) = (10, 20);

pub const EAT_WINDOW: (u64, u64) = (5, 10);

/// Multiplier mixed into the per-philosopher RNG seed
pub const SEED_MULTIPLIER: u64 = 47;
