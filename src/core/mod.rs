/*!
 * Core Module
 * Fundamental table types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{DelayWindow, Pace, TableConfig};
pub use errors::*;
pub use guard::{ForkPairGuard, Guard, GuardDrop, GuardError, GuardResult};
pub use types::*;
