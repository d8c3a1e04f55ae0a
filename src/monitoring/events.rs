/*!
 * Transition Events
 *
 * One event per philosopher state transition. Observers are purely
 * passive; nothing in the protocol reads them back.
 */

use crate::core::types::{ForkIndex, PhilosopherId, Side};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Transition {
    /// Joined the table and is waiting out the staggered start
    Seated { startup: Duration },
    Thinking { duration: Duration },
    PickedUp { side: Side, fork: ForkIndex },
    Eating { duration: Duration, meal: u32 },
    PutDown { meal: u32 },
    /// This philosopher's departure emptied the table
    LastToEat,
    DoneEating,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub philosopher: PhilosopherId,
    #[serde(flatten)]
    pub transition: Transition,
}

impl TransitionEvent {
    pub fn new(philosopher: PhilosopherId, transition: Transition) -> Self {
        Self {
            philosopher,
            transition,
        }
    }
}

/// Receives every transition of every philosopher it is attached to
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, event: &TransitionEvent);
}

/// Renders transitions as log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransitionObserver for TracingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        let id = event.philosopher;
        match &event.transition {
            Transition::Seated { startup } => {
                debug!(philosopher = id, startup_ms = startup.as_millis() as u64, "Philosopher {} sits down, starting in {:?}", id, startup)
            }
            Transition::Thinking { duration } => {
                info!(philosopher = id, think_ms = duration.as_millis() as u64, "Philosopher {} thinks for {:?}...", id, duration)
            }
            Transition::PickedUp { side, fork } => {
                info!(philosopher = id, %side, fork, "Philosopher {} picked up {} fork...", id, side)
            }
            Transition::Eating { duration, meal } => {
                info!(philosopher = id, eat_ms = duration.as_millis() as u64, meal, "Philosopher {} eats for {:?}...", id, duration)
            }
            Transition::PutDown { meal } => {
                info!(philosopher = id, meal, "Philosopher {} puts down both forks", id)
            }
            Transition::LastToEat => info!(philosopher = id, "Philosopher {} was the last to eat !!!", id),
            Transition::DoneEating => info!(philosopher = id, "Philosopher {} is done eating !!!", id),
        }
    }
}

/// Keeps every event in arrival order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of one philosopher, in order
    pub fn events_for(&self, philosopher: PhilosopherId) -> Vec<Transition> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.philosopher == philosopher)
            .map(|e| e.transition.clone())
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Transition) -> bool) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| predicate(&e.transition))
            .count()
    }
}

impl TransitionObserver for RecordingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards each event to several observers
pub struct FanOut(pub Vec<std::sync::Arc<dyn TransitionObserver>>);

impl TransitionObserver for FanOut {
    fn on_transition(&self, event: &TransitionEvent) {
        for observer in &self.0 {
            observer.on_transition(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_filters_by_philosopher() {
        let recorder = RecordingObserver::new();
        recorder.on_transition(&TransitionEvent::new(1, Transition::LastToEat));
        recorder.on_transition(&TransitionEvent::new(2, Transition::DoneEating));

        assert_eq!(recorder.events_for(2), vec![Transition::DoneEating]);
        assert_eq!(recorder.count(|t| *t == Transition::LastToEat), 1);
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = TransitionEvent::new(
            4,
            Transition::PickedUp {
                side: Side::Right,
                fork: 3,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["philosopher"], 4);
        assert_eq!(json["kind"], "picked_up");
        assert_eq!(json["side"], "right");
    }
}
