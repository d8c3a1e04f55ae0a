/*!
 * Counting Semaphores
 * Named semaphore sets shared between cooperating processes
 */

pub mod memory;
#[cfg(target_os = "linux")]
pub mod sysv;
pub mod traits;
pub mod types;

// Re-export public API
pub use memory::MemoryBackend;
#[cfg(target_os = "linux")]
pub use sysv::SysVBackend;
pub use traits::SemaphoreBackend;
pub use types::{SemError, SemOp, SemResult};

#[cfg(test)]
pub use traits::MockSemaphoreBackend;
