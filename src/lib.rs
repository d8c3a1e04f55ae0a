/*!
 * Dining Table Library
 *
 * Five philosopher processes sharing a ring of five forks held in named
 * kernel semaphore sets, each eating three times before leaving.
 */

pub mod cli;
pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod table;

// Re-exports
pub use crate::core::errors::{TableError, TableResult};
pub use crate::core::{Pace, TableConfig};
pub use ipc::{MemoryBackend, SemaphoreBackend};
#[cfg(target_os = "linux")]
pub use ipc::SysVBackend;
pub use monitoring::{init_tracing, RecordingObserver, TracingObserver, TransitionObserver};
pub use table::{AcquisitionOrder, Departure, ParticipantReport, Philosopher, Table};
