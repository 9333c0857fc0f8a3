use std::time::Duration;

use timebucket::{SimpleTokenBucket, SmoothTokenBucket, Throttle};

fn main() {
    let cost = Duration::from_millis(200);

    // the simple bucket makes the second request wait for the first
    let mut simple = Throttle::new(SimpleTokenBucket::new);
    assert!(simple.try_acquire(cost).is_ok());
    let waited = simple.acquire_blocking(cost);
    println!("simple: second request waited {waited:?}");

    // the smooth bucket lets both through at once and repays them over two seconds
    let mut smooth = Throttle::new(SmoothTokenBucket::new);
    assert!(smooth.try_acquire(cost).is_ok());
    let waited = smooth.acquire_blocking(cost);
    println!("smooth: second request waited {waited:?}");
    println!("{}", smooth.bucket());
}
