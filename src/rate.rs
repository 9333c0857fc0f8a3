use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use crate::{Rate, SimpleTokenBucket, Timestamp, TokenBucket};

/// A [`SimpleTokenBucket`] that counts events instead of time.
///
/// Each event costs `1s / rate`, computed once at construction.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU32;
/// use std::time::Duration;
/// use timebucket::{Rate, RateTokenBucket, Timestamp};
///
/// let t0 = Timestamp::ZERO;
/// let mut bucket = RateTokenBucket::new(t0, Rate::per_second(NonZeroU32::new(100).unwrap()));
/// assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0, 5.0));
/// // five events at 100/s need 50ms to be paid back
/// assert_eq!(Duration::from_millis(50), bucket.try_get_tokens(t0, 1.0));
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RateTokenBucket {
    inner: SimpleTokenBucket,
    duration_per_token: Duration,
}

impl RateTokenBucket {
    pub fn new(now: Timestamp, rate: Rate) -> Self {
        Self {
            inner: SimpleTokenBucket::new(now),
            duration_per_token: rate.duration_per_token(),
        }
    }

    /// Attempts to take `token_count` events worth of time from the bucket.
    ///
    /// # Panics
    ///
    /// If `token_count` is negative, not finite, or its cost overflows
    /// [`Duration`].
    pub fn try_get_tokens(&mut self, now: Timestamp, token_count: f64) -> Duration {
        self.inner
            .try_get_tokens(now, self.duration_per_token.mul_f64(token_count))
    }

    pub fn duration_per_token(&self) -> Duration {
        self.duration_per_token
    }
}

impl TokenBucket for RateTokenBucket {
    type Cost = f64;

    fn try_get_tokens(&mut self, now: Timestamp, token_count: f64) -> Duration {
        RateTokenBucket::try_get_tokens(self, now, token_count)
    }
}

impl Debug for RateTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for RateTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RateTokenBucket({}, duration_per_token={:?})",
            self.inner, self.duration_per_token
        )
    }
}
