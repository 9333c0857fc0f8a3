use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use timebucket::{Clock, FastClock, ManualClock, QuantaClock, StdClock, Timestamp};

fn time_single_threaded(c: &mut Criterion) {
    let c_clock = quanta::Clock::new();
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_micros(10), c_clock.clone())
        .start()
        .unwrap();
    let mut group = c.benchmark_group("clocks");
    group
        .sample_size(100)
        .bench_function("std-now", |b| {
            let clock = StdClock::default();
            b.iter(|| clock.now());
        })
        .bench_function("quanta-now", |b| {
            let clock = QuantaClock::default();
            b.iter(|| clock.now());
        })
        .bench_function("quanta-fast-now", |b| {
            let clock = FastClock::new(c_clock.clone());
            b.iter(|| clock.now());
        })
        .bench_function("manual-now", |b| {
            let clock = ManualClock::new(Timestamp::from_secs_f64(10.0));
            b.iter(|| clock.now());
        });
    group.finish();
}

fn timestamp_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp");
    group
        .bench_function("add-duration", |b| {
            let t = Timestamp::from_secs_f64(3600.0);
            b.iter(|| std::hint::black_box(t) + std::hint::black_box(Duration::from_micros(100)));
        })
        .bench_function("difference", |b| {
            let t0 = Timestamp::from_secs_f64(3600.0);
            let t1 = t0 + Duration::from_millis(10);
            b.iter(|| std::hint::black_box(t1) - std::hint::black_box(t0));
        });
    group.finish();
}

criterion_group!(time_benches, time_single_threaded, timestamp_arithmetic);
criterion_main!(time_benches);
