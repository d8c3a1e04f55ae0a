/*!
 * Semaphore Benchmarks
 *
 * Fork pick-up/put-down cost and contended departures on the
 * in-process backend, plus the kernel backend where available
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dining_table::core::types::SemKey;
use dining_table::{MemoryBackend, SemaphoreBackend};
use std::sync::Arc;
use std::thread;

fn backends() -> Vec<(&'static str, Arc<dyn SemaphoreBackend>)> {
    let mut backends: Vec<(&'static str, Arc<dyn SemaphoreBackend>)> =
        vec![("memory", Arc::new(MemoryBackend::new()))];
    #[cfg(target_os = "linux")]
    {
        let sysv = dining_table::SysVBackend::new();
        // only bench the kernel when it lets us create a set
        if let Ok(set) = sysv.ensure(SemKey(0x3bec_0000), 1) {
            let _ = sysv.remove(set);
            backends.push(("sysv", Arc::new(sysv)));
        }
    }
    backends
}

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");

    for (name, backend) in backends() {
        let set = match backend.ensure(SemKey(0x3bec_0001), 5) {
            Ok(set) => set,
            Err(_) => continue,
        };
        for index in 0..5 {
            backend.set_value(set, index, 1).ok();
        }

        group.bench_with_input(BenchmarkId::from_parameter(name), &set, |b, &set| {
            b.iter(|| {
                backend.acquire(set, black_box(2)).ok();
                backend.release(set, black_box(2)).ok();
            });
        });

        backend.remove(set).ok();
    }

    group.finish();
}

fn bench_contended_fork(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_fork");
    let backend = Arc::new(MemoryBackend::new());

    for threads in [2usize, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let set = backend.ensure(SemKey(0x3bec_0002), 1).unwrap();
            backend.set_value(set, 0, 1).unwrap();

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let backend = backend.clone();
                        thread::spawn(move || {
                            for _ in 0..100 {
                                backend.acquire(set, 0).ok();
                                backend.release(set, 0).ok();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });

            backend.remove(set).unwrap();
        });
    }

    group.finish();
}

fn bench_departures(c: &mut Criterion) {
    let backend = MemoryBackend::new();

    c.bench_function("depart_five", |b| {
        b.iter(|| {
            let set = backend.ensure(SemKey(0x3bec_0003), 1).unwrap();
            backend.set_value(set, 0, 5).unwrap();
            let mut lasts = 0;
            for _ in 0..5 {
                if backend.acquire_and_test_zero(set, 0).unwrap() {
                    lasts += 1;
                }
            }
            backend.remove(set).unwrap();
            black_box(lasts)
        });
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_contended_fork,
    bench_departures
);
criterion_main!(benches);
