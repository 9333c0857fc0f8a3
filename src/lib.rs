#![doc = include_str!("../README.md")]
//!
//! # Core Components
//!
//! - [`SimpleTokenBucket`] - The time-budget primitive: one request in debt at a time
//! - [`BurstTokenBucket`] - Adds a fixed burst allowance on top
//! - [`RateTokenBucket`] - Counts events at a configured [`Rate`] instead of time
//! - [`SmoothTokenBucket`] - Spreads each request over a longer window instead of blocking
//! - [`Throttle`] - Pairs any [`TokenBucket`] with a [`Clock`]
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use timebucket::{SmoothTokenBucket, Throttle};
//!
//! let mut throttle = Throttle::new(SmoothTokenBucket::new);
//!
//! // a one second request does not hold back the requests behind it
//! assert!(throttle.try_acquire(Duration::from_secs(1)).is_ok());
//! match throttle.try_acquire(Duration::from_millis(10)) {
//!     Ok(()) => println!("admitted"),
//!     Err(rate_limited) => println!("retry in {:?}", rate_limited.earliest_retry_after()),
//! }
//! ```

mod burst;
mod clock;
mod error;
#[cfg(feature = "async")]
pub mod futures;
mod limit;
mod rate;
mod simple;
mod smooth;
mod throttle;
mod time;
mod tokenbucket;

pub use burst::BurstTokenBucket;
#[cfg(feature = "tokio")]
pub use clock::TokioClock;
pub use clock::{Clock, ManualClock, StdClock};
#[cfg(feature = "quanta")]
pub use clock::{FastClock, QuantaClock};
pub use error::*;
#[cfg(feature = "async")]
pub use futures::RateLimitedStreamExt;
pub use limit::{Rate, Smoothing};
pub use rate::RateTokenBucket;
pub use simple::SimpleTokenBucket;
#[cfg(any(test, feature = "test-util"))]
pub use smooth::SpanIntrospector;
pub use smooth::{RateSpan, SmoothTokenBucket};
pub use throttle::Throttle;
pub use time::Timestamp;
pub use tokenbucket::TokenBucket;
