/*!
 * Monitoring
 * Log setup and philosopher transition events
 */

pub mod events;
pub mod tracer;

pub use events::{FanOut, RecordingObserver, TracingObserver, Transition, TransitionEvent, TransitionObserver};
pub use tracer::init_tracing;
