use std::time::Duration;

use nonzero_ext::nonzero;
use timebucket::{FastClock, Rate, RateTokenBucket, Throttle};

fn main() {
    let clock = quanta::Clock::new();
    // Updates at 1Khz
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_millis(1), clock.clone())
        .start()
        .unwrap();
    let clock = FastClock::new(clock);
    let mut throttle = Throttle::with_clock(clock, |now| {
        RateTokenBucket::new(now, Rate::per_second(nonzero!(10u32)))
    });

    // five events go through at once, then the bucket is half a second in debt
    assert!(throttle.try_acquire(5.0).is_ok());
    match throttle.try_acquire(1.0) {
        Ok(()) => println!("admitted"),
        Err(rate_limited) => println!("{rate_limited}"),
    }
    println!("waiting for one more event...");
    let waited = throttle.acquire_blocking(1.0);
    println!("waited {waited:?}: {}", throttle.bucket());
}
