/*!
 * IPC Module
 * Inter-process communication through named counting semaphores
 */

pub mod semaphore;

// Re-export for convenience
pub use semaphore::{MemoryBackend, SemError, SemOp, SemResult, SemaphoreBackend};
#[cfg(target_os = "linux")]
pub use semaphore::SysVBackend;
