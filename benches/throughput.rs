use std::sync::{Arc, Mutex};
use std::time::Duration;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use nonzero_ext::nonzero;
use timebucket::{
    BurstTokenBucket, FastClock, QuantaClock, Rate, RateTokenBucket, SimpleTokenBucket,
    SmoothTokenBucket, StdClock, Throttle, Timestamp,
};

const COST: Duration = Duration::from_micros(100);

fn bench_virtual_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenbucket");
    group
        .throughput(Throughput::Elements(1))
        .sample_size(100)
        .bench_function("simple-admit", |b| {
            let mut now = Timestamp::ZERO;
            let mut tb = SimpleTokenBucket::new(now);
            b.iter(|| {
                now += COST;
                std::hint::black_box(tb.try_get_tokens(now, COST));
            });
        })
        .bench_function("simple-reject", |b| {
            let now = Timestamp::ZERO;
            let mut tb = SimpleTokenBucket::new(now);
            tb.try_get_tokens(now, Duration::from_secs(3600));
            b.iter(|| std::hint::black_box(tb.try_get_tokens(now, COST)));
        })
        .bench_function("burst-admit", |b| {
            let mut now = Timestamp::ZERO;
            let mut tb = BurstTokenBucket::new(now, 10 * COST);
            b.iter(|| {
                now += COST;
                std::hint::black_box(tb.try_get_tokens(now, COST));
            });
        })
        .bench_function("rate-admit", |b| {
            let mut now = Timestamp::ZERO;
            let mut tb = RateTokenBucket::new(now, Rate::per_second(nonzero!(10_000u32)));
            b.iter(|| {
                now += COST;
                std::hint::black_box(tb.try_get_tokens(now, 1.0));
            });
        })
        .bench_function("smooth-admit", |b| {
            let mut now = Timestamp::ZERO;
            let mut tb = SmoothTokenBucket::new(now);
            b.iter(|| {
                now += COST;
                std::hint::black_box(tb.try_get_tokens(now, COST));
            });
        })
        .bench_function("smooth-saturated", |b| {
            // every call either splits spans or is rejected
            let mut now = Timestamp::ZERO;
            let mut tb = SmoothTokenBucket::new(now);
            b.iter(|| {
                let wait = tb.try_get_tokens(now, COST);
                now += wait.min(COST);
                std::hint::black_box(wait);
            });
        });
    group.finish();
}

fn bench_clocks(c: &mut Criterion) {
    let clock = quanta::Clock::new();
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_micros(10), clock.clone())
        .start()
        .unwrap();
    let fast_clock = FastClock::new(clock);
    let mut group = c.benchmark_group("throttle");
    group
        .throughput(Throughput::Elements(1))
        .sample_size(100)
        .bench_function("check-std-clock", |b| {
            let mut throttle = Throttle::with_clock(StdClock::default(), SmoothTokenBucket::new);
            b.iter(|| std::hint::black_box(throttle.check(COST)));
        })
        .bench_function("check-quanta-clock", |b| {
            let mut throttle = Throttle::with_clock(QuantaClock::default(), SmoothTokenBucket::new);
            b.iter(|| std::hint::black_box(throttle.check(COST)));
        })
        .bench_function("check-fast-clock", |b| {
            let mut throttle = Throttle::with_clock(fast_clock.clone(), SmoothTokenBucket::new);
            b.iter(|| std::hint::black_box(throttle.check(COST)));
        });
    group.finish();
}

const THREADS: u32 = 8;

fn multi_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_threaded");
    group
        .throughput(Throughput::Elements(1))
        .bench_function("mutex-smooth", |b| {
            let throttle = Arc::new(Mutex::new(Throttle::with_clock(
                StdClock::default(),
                SmoothTokenBucket::new,
            )));
            b.iter_custom(|iters| {
                let mut children = vec![];
                let start = std::time::Instant::now();
                for _i in 0..THREADS {
                    let throttle = Arc::clone(&throttle);
                    children.push(std::thread::spawn(move || {
                        for _i in 0..iters {
                            let wait = throttle.lock().unwrap().check(COST);
                            std::hint::black_box(wait);
                        }
                    }));
                }
                for child in children {
                    child.join().unwrap()
                }
                start.elapsed()
            })
        });
    group.finish();
}

criterion_group!(benches, bench_virtual_time, bench_clocks, multi_threaded);
criterion_main!(benches);
