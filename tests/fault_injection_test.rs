/*!
 * Fault Injection Tests
 *
 * A backend that fails chosen fork acquisitions, to check that a
 * philosopher hitting a fatal error puts back every fork it holds.
 */

use dining_table::core::types::{SemKey, SemSetId, SemValue, Side};
use dining_table::ipc::{SemError, SemOp, SemResult};
use dining_table::monitoring::Transition;
use dining_table::{
    AcquisitionOrder, MemoryBackend, Philosopher, RecordingObserver, SemaphoreBackend,
    TableConfig, TableError, TransitionObserver,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const EINVAL: i32 = 22;

/// In-process backend whose acquire of one counter index starts failing
/// after a number of successful calls
struct FaultyBackend {
    inner: MemoryBackend,
    failing_index: usize,
    successes_left: AtomicUsize,
}

impl FaultyBackend {
    fn new(inner: MemoryBackend, failing_index: usize, successes: usize) -> Self {
        Self {
            inner,
            failing_index,
            successes_left: AtomicUsize::new(successes),
        }
    }
}

impl SemaphoreBackend for FaultyBackend {
    fn ensure(&self, key: SemKey, count: usize) -> SemResult<SemSetId> {
        self.inner.ensure(key, count)
    }

    fn lookup(&self, key: SemKey) -> SemResult<Option<SemSetId>> {
        self.inner.lookup(key)
    }

    fn set_value(&self, set: SemSetId, index: usize, value: SemValue) -> SemResult<()> {
        self.inner.set_value(set, index, value)
    }

    fn value(&self, set: SemSetId, index: usize) -> SemResult<SemValue> {
        self.inner.value(set, index)
    }

    fn acquire(&self, set: SemSetId, index: usize) -> SemResult<()> {
        if index == self.failing_index {
            let allowed = self
                .successes_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !allowed {
                return Err(SemError::os(SemOp::Acquire, EINVAL, "injected failure"));
            }
        }
        self.inner.acquire(set, index)
    }

    fn acquire_and_test_zero(&self, set: SemSetId, index: usize) -> SemResult<bool> {
        self.inner.acquire_and_test_zero(set, index)
    }

    fn release(&self, set: SemSetId, index: usize) -> SemResult<()> {
        self.inner.release(set, index)
    }

    fn remove(&self, set: SemSetId) -> SemResult<()> {
        self.inner.remove(set)
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

struct Harness {
    memory: MemoryBackend,
    config: TableConfig,
    recorder: Arc<RecordingObserver>,
}

impl Harness {
    fn new(order: AcquisitionOrder) -> Self {
        Self {
            memory: MemoryBackend::new(),
            config: TableConfig::instant().order(order),
            recorder: Arc::new(RecordingObserver::new()),
        }
    }

    /// Set the table through philosopher 0, then seat `id` on a faulty view of it
    fn seat_faulty(&self, id: usize, failing_fork: usize, successes: usize) -> Philosopher {
        let observer: Arc<dyn TransitionObserver> = self.recorder.clone();
        let clean: Arc<dyn SemaphoreBackend> = Arc::new(self.memory.clone());
        Philosopher::seat(clean, self.config.clone(), 0, observer.clone()).unwrap();

        let faulty: Arc<dyn SemaphoreBackend> = Arc::new(FaultyBackend::new(
            self.memory.clone(),
            failing_fork,
            successes,
        ));
        Philosopher::seat(faulty, self.config.clone(), id, observer).unwrap()
    }

    fn fork_values(&self) -> Vec<SemValue> {
        let set = self.memory.lookup(self.config.fork_key).unwrap().unwrap();
        (0..5).map(|i| self.memory.value(set, i).unwrap()).collect()
    }

    fn count_value(&self) -> SemValue {
        let set = self.memory.lookup(self.config.count_key).unwrap().unwrap();
        self.memory.value(set, 0).unwrap()
    }
}

#[test]
fn test_second_fork_failure_returns_first_fork() {
    let harness = Harness::new(AcquisitionOrder::Uniform);
    // philosopher 2: left fork 2, right fork 1
    let result = harness.seat_faulty(2, 1, 0).run();

    match result {
        Err(TableError::Acquisition {
            philosopher,
            side,
            fork,
            ..
        }) => {
            assert_eq!(philosopher, 2);
            assert_eq!(side, Side::Right);
            assert_eq!(fork, 1);
        }
        other => panic!("expected acquisition error, got {:?}", other),
    }

    assert_eq!(harness.fork_values(), vec![1; 5]);
    assert_eq!(
        harness.recorder.count(|t| matches!(
            t,
            Transition::PickedUp {
                side: Side::Left,
                fork: 2
            }
        )),
        1
    );
    assert_eq!(harness.recorder.count(|t| matches!(t, Transition::Eating { .. })), 0);
}

#[test]
fn test_failure_mid_run_keeps_earlier_meals_and_returns_forks() {
    let harness = Harness::new(AcquisitionOrder::Uniform);
    let result = harness.seat_faulty(2, 1, 1).run();

    assert!(matches!(
        result,
        Err(TableError::Acquisition {
            philosopher: 2,
            side: Side::Right,
            fork: 1,
            ..
        })
    ));
    assert_eq!(harness.recorder.count(|t| matches!(t, Transition::Eating { .. })), 1);
    assert_eq!(harness.recorder.count(|t| matches!(t, Transition::PutDown { meal: 1 })), 1);
    assert_eq!(harness.fork_values(), vec![1; 5]);
}

#[test]
fn test_failed_philosopher_never_departs() {
    let harness = Harness::new(AcquisitionOrder::Uniform);
    let result = harness.seat_faulty(3, 2, 0).run();

    assert!(result.is_err());
    assert_eq!(harness.count_value(), 5);
    assert_eq!(harness.recorder.count(|t| *t == Transition::DoneEating), 0);
    assert_eq!(harness.recorder.count(|t| *t == Transition::LastToEat), 0);
}

#[test]
fn test_ordered_failure_on_first_fork_holds_nothing() {
    let harness = Harness::new(AcquisitionOrder::Ordered);
    // ordered: philosopher 2 reaches for fork 1 (its right) first
    let result = harness.seat_faulty(2, 1, 0).run();

    assert!(matches!(
        result,
        Err(TableError::Acquisition {
            side: Side::Right,
            fork: 1,
            ..
        })
    ));
    assert_eq!(harness.recorder.count(|t| matches!(t, Transition::PickedUp { .. })), 0);
    assert_eq!(harness.fork_values(), vec![1; 5]);
}

#[test]
fn test_injected_error_surfaces_as_source() {
    let harness = Harness::new(AcquisitionOrder::Uniform);
    let err = harness.seat_faulty(4, 3, 0).run().unwrap_err();

    assert_eq!(err.philosopher(), Some(4));
    assert_eq!(
        err.sem_error(),
        Some(&SemError::os(SemOp::Acquire, EINVAL, "injected failure"))
    );
}
