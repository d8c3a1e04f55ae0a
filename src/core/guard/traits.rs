/*!
 * Guard Traits
 *
 * Core abstractions for RAII resource guards
 */

use super::{GuardMetadata, GuardResult};

/// Core guard trait
///
/// All guards provide:
/// - Resource type identification
/// - Metadata access
/// - Manual release capability
pub trait Guard: Send {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Get guard metadata
    fn metadata(&self) -> &GuardMetadata;

    /// Check if the guard still holds anything
    fn is_active(&self) -> bool;

    /// Manually release the resource
    ///
    /// Returns `Err` if already released
    fn release(&mut self) -> GuardResult<()>;
}

/// Guards that can be dropped with custom cleanup
///
/// Separates Drop logic for better testability and observability
pub trait GuardDrop: Guard {
    /// Perform cleanup on drop
    ///
    /// # Panics
    ///
    /// Should NOT panic. Log errors instead.
    fn on_drop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::super::GuardError;
    use super::*;

    struct TestGuard {
        metadata: GuardMetadata,
        active: bool,
    }

    impl Guard for TestGuard {
        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn metadata(&self) -> &GuardMetadata {
            &self.metadata
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn release(&mut self) -> GuardResult<()> {
            if !self.active {
                return Err(GuardError::AlreadyReleased);
            }
            self.active = false;
            Ok(())
        }
    }

    #[test]
    fn test_guard_release() {
        let mut guard = TestGuard {
            metadata: GuardMetadata::new("test").with_philosopher(3),
            active: true,
        };

        assert!(guard.is_active());
        assert_eq!(guard.metadata().philosopher, Some(3));
        assert!(guard.release().is_ok());
        assert!(!guard.is_active());
        assert!(guard.release().is_err());
    }
}
