//! Drives a bucket at full speed on a virtual clock and logs the rate it lets
//! through.
//!
//! ```text
//! cargo run --example token_bucket_demo -- --bucket smooth
//! RUST_LOG=timebucket=trace cargo run --example token_bucket_demo -- --bucket smooth
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use nonzero_ext::nonzero;
use timebucket::{
    BurstTokenBucket, Rate, RateTokenBucket, SimpleTokenBucket, SmoothTokenBucket, Timestamp,
};
use tracing::info;

/// 10k requests per second.
const REQUEST_COST: Duration = Duration::from_micros(100);
const RUN_FOR: Duration = Duration::from_secs(5);
const BREAK: Duration = Duration::from_secs(3600);
const REQUESTS_AFTER_BREAK: usize = 20;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum BucketKind {
    #[default]
    Simple,
    Rate,
    Burst,
    Smooth,
}

#[derive(Debug, Parser)]
#[command(about = "Token bucket throughput demo on a virtual clock")]
struct Args {
    /// Which bucket to drive
    #[arg(long, value_enum, default_value_t)]
    bucket: BucketKind,

    /// Burst allowance of the burst bucket, in microseconds
    #[arg(long, default_value_t = 1000)]
    burst_us: u64,
}

type Admit = Box<dyn FnMut(Timestamp) -> Duration>;

fn make_bucket(args: &Args, now: Timestamp) -> Admit {
    match args.bucket {
        BucketKind::Simple => {
            let mut tb = SimpleTokenBucket::new(now);
            Box::new(move |now| tb.try_get_tokens(now, REQUEST_COST))
        }
        BucketKind::Rate => {
            let rate = Rate::per_second(nonzero!(10_000u32));
            info!(?rate, "running RateTokenBucket");
            let mut tb = RateTokenBucket::new(now, rate);
            Box::new(move |now| tb.try_get_tokens(now, 1.0))
        }
        BucketKind::Burst => {
            let burst = Duration::from_micros(args.burst_us);
            info!(?burst, "running BurstTokenBucket");
            let mut tb = BurstTokenBucket::new(now, burst);
            Box::new(move |now| tb.try_get_tokens(now, REQUEST_COST))
        }
        BucketKind::Smooth => {
            let mut tb = SmoothTokenBucket::new(now);
            info!(smoothing = ?tb.smoothing(), "running SmoothTokenBucket");
            Box::new(move |now| tb.try_get_tokens(now, REQUEST_COST))
        }
    }
}

/// Sends requests as fast as the bucket admits them, sleeping (virtually)
/// whenever it asks to. Returns the time at the end of the run.
fn run_at_full_speed(mut now: Timestamp, admit: &mut Admit) -> Timestamp {
    let start_time = now;
    let end_time = now + RUN_FOR;
    let mut next_log_time = now + Duration::from_secs(1);
    let mut request_count = 0u64;
    let mut prev_log_request_count = 0u64;
    while now < end_time {
        let d = admit(now);
        if d.is_zero() {
            request_count += 1;
        } else {
            now += d;
        }
        if now >= next_log_time {
            let seconds = (now - next_log_time + Duration::from_secs(1)).as_secs_f64();
            let requests = request_count - prev_log_request_count;
            info!(
                rate = requests as f64 / seconds,
                request_count = requests,
                seconds,
                "request rate (r/s)"
            );
            next_log_time += Duration::from_secs(1);
            prev_log_request_count = request_count;
        }
    }
    let total_seconds = (now - start_time).as_secs_f64();
    info!(
        rate = request_count as f64 / total_seconds,
        request_count, total_seconds, "total rate (r/s)"
    );
    now
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut now = Timestamp::from(BREAK);
    let mut admit = make_bucket(&args, now);

    for _ in 0..2 {
        now = run_at_full_speed(now, &mut admit);
        info!("sleeping for {BREAK:?}");
        now += BREAK;
    }

    info!("delays for the first {REQUESTS_AFTER_BREAK} requests after a break:");
    for i in 0..REQUESTS_AFTER_BREAK {
        let d = admit(now);
        info!("d{i}: {d:?}");
        if !d.is_zero() {
            now += d;
            assert_eq!(Duration::ZERO, admit(now), "request not admitted after waiting");
        }
    }
}
