use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use crate::{Timestamp, TokenBucket};

/// A token bucket that refills at one second per second and hands out time.
///
/// The bucket tracks a single `zero_time`: the instant at which all admitted
/// work has been paid back. A request is admitted whenever `now` has reached
/// `zero_time`, and pushes `zero_time` to `now + cost`. There is no burst, but
/// the first request is always let through, however large it is. Every request
/// after a large one waits for that request's full cost.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use timebucket::{SimpleTokenBucket, Timestamp};
///
/// let t0 = Timestamp::ZERO;
/// let mut bucket = SimpleTokenBucket::new(t0);
/// let cost = Duration::from_millis(10);
///
/// assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0, cost));
/// assert_eq!(cost, bucket.try_get_tokens(t0, cost));
/// assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0 + cost, cost));
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SimpleTokenBucket {
    zero_time: Timestamp,
}

impl SimpleTokenBucket {
    pub fn new(now: Timestamp) -> Self {
        Self { zero_time: now }
    }

    /// Attempts to take `cost` worth of time from the bucket.
    ///
    /// Returns [`Duration::ZERO`] if the request is admitted, otherwise the
    /// delay after which the bucket is back to zero. Zero-cost requests are
    /// always admitted and leave the bucket untouched.
    pub fn try_get_tokens(&mut self, now: Timestamp, cost: Duration) -> Duration {
        if cost.is_zero() {
            return Duration::ZERO;
        }
        if now >= self.zero_time {
            self.zero_time = now + cost;
            Duration::ZERO
        } else {
            self.zero_time - now
        }
    }

    /// The instant at which all admitted work has been paid back.
    pub fn zero_time(&self) -> Timestamp {
        self.zero_time
    }
}

impl TokenBucket for SimpleTokenBucket {
    type Cost = Duration;

    fn try_get_tokens(&mut self, now: Timestamp, cost: Duration) -> Duration {
        SimpleTokenBucket::try_get_tokens(self, now, cost)
    }
}

impl Debug for SimpleTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SimpleTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimpleTokenBucket(zero_time={})", self.zero_time)
    }
}
