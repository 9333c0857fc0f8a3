use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use likely_stable::likely;

use crate::{SimpleTokenBucket, Timestamp, TokenBucket};

/// A [`SimpleTokenBucket`] with a fixed time credit on top.
///
/// Up to `max_burst` worth of cost is admitted instantly before the usual
/// one-request-at-a-time spacing applies. The credit refills at one second
/// per second while the bucket is idle.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use timebucket::{BurstTokenBucket, Timestamp};
///
/// let t0 = Timestamp::ZERO;
/// let token = Duration::from_millis(1);
/// let mut bucket = BurstTokenBucket::new(t0, 3 * token);
///
/// // three tokens of burst plus the one request that is always let through
/// for _ in 0..4 {
///     assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0, token));
/// }
/// assert_eq!(token, bucket.try_get_tokens(t0, token));
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BurstTokenBucket {
    inner: SimpleTokenBucket,
    max_burst: Duration,
}

impl BurstTokenBucket {
    pub fn new(now: Timestamp, max_burst: Duration) -> Self {
        Self {
            inner: SimpleTokenBucket::new(now - max_burst),
            max_burst,
        }
    }

    /// Attempts to take `cost` worth of time from the bucket.
    ///
    /// Returns [`Duration::ZERO`] if the request is admitted, otherwise the
    /// delay the caller should wait before retrying.
    pub fn try_get_tokens(&mut self, now: Timestamp, cost: Duration) -> Duration {
        if cost.is_zero() {
            return Duration::ZERO;
        }
        // Pretend the request arrived `max_burst` ago: whatever debt is younger
        // than that is covered by the credit.
        let past_with_burst = now - self.max_burst;
        let delay = self.inner.try_get_tokens(past_with_burst, cost);
        if likely(delay.is_zero()) {
            return Duration::ZERO;
        }
        if delay <= self.max_burst {
            let delay = self.inner.try_get_tokens(past_with_burst + delay, cost);
            debug_assert_eq!(Duration::ZERO, delay);
            return Duration::ZERO;
        }
        delay - self.max_burst
    }

    pub fn max_burst(&self) -> Duration {
        self.max_burst
    }
}

impl TokenBucket for BurstTokenBucket {
    type Cost = Duration;

    fn try_get_tokens(&mut self, now: Timestamp, cost: Duration) -> Duration {
        BurstTokenBucket::try_get_tokens(self, now, cost)
    }
}

impl Debug for BurstTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for BurstTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BurstTokenBucket({}, max_burst={:?})",
            self.inner, self.max_burst
        )
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn burst_admits_floor_plus_one(burst_us in 0u64..50_000, cost_us in 1u64..5_000) {
            let burst = Duration::from_micros(burst_us);
            let cost = Duration::from_micros(cost_us);
            let now = Timestamp::from_secs_f64(3600.0);
            let mut btb = BurstTokenBucket::new(now, burst);

            let expected = burst_us / cost_us + 1;
            for _ in 0..expected {
                prop_assert_eq!(Duration::ZERO, btb.try_get_tokens(now, cost));
            }
            prop_assert!(btb.try_get_tokens(now, cost) > Duration::ZERO);
        }
    }
}
