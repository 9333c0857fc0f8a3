use std::time::Duration;

use futures::{StreamExt, stream};
use timebucket::futures::RateLimitedStreamExt;
use timebucket::{FastClock, SmoothTokenBucket, Throttle};
use tokio::task::JoinSet;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let clock = quanta::Clock::new();
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_micros(150), clock.clone())
        .start()
        .unwrap();
    let clock = FastClock::new(clock);
    let start = tokio::time::Instant::now();

    let mut handles = JoinSet::new();
    for i in 1..=4 {
        // each stream gets its own bucket: 50ms per item, smoothed
        let throttle = Throttle::with_clock(clock.clone(), SmoothTokenBucket::new);
        handles.spawn(async move {
            let mut items = std::pin::pin!(
                stream::iter(1..=40).rate_limit(throttle, |_| Duration::from_millis(50))
            );
            while let Some(item) = items.next().await {
                println!("[stream={i}] item: {}, elapsed={:?}", item, start.elapsed());
            }
        });
    }

    // variable costs: a payload of `n` bytes costs `n` milliseconds
    let throttle = Throttle::with_clock(clock, SmoothTokenBucket::new);
    let payloads = stream::iter(vec![10u32, 500, 20, 5, 800, 1])
        .rate_limit(throttle, |len| Duration::from_millis(u64::from(*len)));
    handles.spawn(async move {
        let mut payloads = std::pin::pin!(payloads);
        while let Some(len) = payloads.next().await {
            println!("[payloads] {len} bytes, elapsed={:?}", start.elapsed());
        }
    });

    handles.join_all().await;
    println!("Completed in {:?}", start.elapsed());
}
