use std::fmt::{Debug, Formatter};
use std::time::Duration;

use tracing::trace;

use crate::error::RateLimited;
use crate::{Clock, StdClock, TokenBucket};

/// A token bucket paired with the clock that drives it.
///
/// Buckets themselves only ever see the `now` their caller passes in. A
/// `Throttle` reads that `now` from its clock, so call sites only deal with
/// costs.
///
/// # Type Parameters
///
/// - `B`: the [`TokenBucket`] that decides admission
/// - `C`: Clock implementation (default: [`StdClock`])
///
/// A throttle has no internal synchronization: wrap it in a `Mutex` to share it
/// between threads.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use timebucket::{BurstTokenBucket, Throttle};
///
/// let mut throttle = Throttle::new(|now| BurstTokenBucket::new(now, Duration::from_millis(20)));
///
/// // 10ms per request, two of them fit in the burst
/// let cost = Duration::from_millis(10);
/// assert!(throttle.try_acquire(cost).is_ok());
/// assert!(throttle.try_acquire(cost).is_ok());
/// ```
#[derive(Clone)]
pub struct Throttle<B, C = StdClock> {
    bucket: B,
    clock: C,
}

impl<B: TokenBucket> Throttle<B, StdClock> {
    /// Creates a throttle on the standard monotonic clock, building the bucket
    /// from the clock's current time.
    pub fn new(make_bucket: impl FnOnce(crate::Timestamp) -> B) -> Self {
        Self::with_clock(StdClock::default(), make_bucket)
    }
}

impl<B: TokenBucket, C: Clock> Throttle<B, C> {
    /// Creates a throttle with a custom clock implementation.
    ///
    /// The bucket is built from the clock's current time so both agree on
    /// where time starts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use timebucket::{ManualClock, SmoothTokenBucket, Throttle};
    ///
    /// let clock = ManualClock::default();
    /// let mut throttle = Throttle::with_clock(&clock, SmoothTokenBucket::new);
    /// assert_eq!(Duration::ZERO, throttle.check(Duration::from_secs(1)));
    /// ```
    pub fn with_clock(clock: C, make_bucket: impl FnOnce(crate::Timestamp) -> B) -> Self {
        let bucket = make_bucket(clock.now());
        Self { bucket, clock }
    }

    /// Pairs an existing bucket with a clock. The bucket must have been
    /// created on the same time scale as `clock`.
    pub fn from_parts(bucket: B, clock: C) -> Self {
        Self { bucket, clock }
    }

    /// Asks the bucket for `cost` at the clock's current time.
    ///
    /// Returns [`Duration::ZERO`] if admitted, otherwise how long to wait
    /// before asking again. Nothing is reserved on rejection.
    pub fn check(&mut self, cost: B::Cost) -> Duration {
        let now = self.clock.now();
        let wait = self.bucket.try_get_tokens(now, cost);
        if !wait.is_zero() {
            trace!(%now, ?wait, "throttled");
        }
        wait
    }

    /// Like [`check`](Self::check), as a `Result`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use timebucket::{ManualClock, SimpleTokenBucket, Throttle};
    ///
    /// let clock = ManualClock::default();
    /// let mut throttle = Throttle::with_clock(&clock, SimpleTokenBucket::new);
    /// let cost = Duration::from_millis(100);
    ///
    /// assert!(throttle.try_acquire(cost).is_ok());
    /// match throttle.try_acquire(cost) {
    ///     Ok(()) => unreachable!(),
    ///     Err(rate_limited) => {
    ///         assert_eq!(cost, rate_limited.earliest_retry_after());
    ///     }
    /// }
    /// ```
    pub fn try_acquire(&mut self, cost: B::Cost) -> Result<(), RateLimited> {
        let earliest_retry_after = self.check(cost);
        if earliest_retry_after.is_zero() {
            Ok(())
        } else {
            Err(RateLimited {
                earliest_retry_after,
            })
        }
    }

    /// Puts the calling thread to sleep until `cost` is admitted.
    ///
    /// Returns the total time slept, `Duration::ZERO` when `cost` is admitted
    /// right away. The clock must advance on its own while sleeping, a
    /// [`ManualClock`](crate::ManualClock) that nobody advances makes this
    /// loop forever.
    pub fn acquire_blocking(&mut self, cost: B::Cost) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = self.check(cost);
            if wait.is_zero() {
                return waited;
            }
            std::thread::sleep(wait);
            waited += wait;
        }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    pub fn bucket_mut(&mut self) -> &mut B {
        &mut self.bucket
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_parts(self) -> (B, C) {
        (self.bucket, self.clock)
    }
}

impl<B: Debug, C> Debug for Throttle<B, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use nonzero_ext::nonzero;

    use crate::{
        BurstTokenBucket, ManualClock, Rate, RateTokenBucket, SimpleTokenBucket,
        SmoothTokenBucket, Timestamp,
    };

    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn follows_the_clock() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs_f64(10.0)));
        let mut throttle = Throttle::with_clock(Arc::clone(&clock), SimpleTokenBucket::new);
        assert_eq!(Timestamp::from_secs_f64(10.0), throttle.bucket().zero_time());

        assert_eq!(Duration::ZERO, throttle.check(10 * MS));
        assert_eq!(10 * MS, throttle.check(10 * MS));
        clock.advance(4 * MS);
        assert_eq!(6 * MS, throttle.check(10 * MS));
        clock.advance(6 * MS);
        assert_eq!(Duration::ZERO, throttle.check(10 * MS));
    }

    #[test]
    fn rate_limited_carries_the_wait() {
        let clock = ManualClock::default();
        let mut throttle =
            Throttle::with_clock(&clock, |now| RateTokenBucket::new(now, Rate::per_second(nonzero!(4u32))));
        assert!(throttle.try_acquire(2.0).is_ok());
        let err = throttle.try_acquire(1.0).unwrap_err();
        assert_eq!(Duration::from_millis(500), err.earliest_retry_after());

        clock.advance(Duration::from_millis(500));
        assert!(throttle.try_acquire(1.0).is_ok());
    }

    #[test]
    fn from_parts_and_back() {
        let clock = ManualClock::default();
        let bucket = BurstTokenBucket::new(clock.now(), 5 * MS);
        let mut throttle = Throttle::from_parts(bucket, &clock);
        for _ in 0..6 {
            assert!(throttle.try_acquire(MS).is_ok());
        }
        assert!(throttle.try_acquire(MS).is_err());
        let (bucket, _) = throttle.into_parts();
        assert_eq!(5 * MS, bucket.max_burst());
    }

    #[test]
    fn shared_behind_a_mutex() {
        let clock = Arc::new(ManualClock::default());
        let throttle = Mutex::new(Throttle::with_clock(Arc::clone(&clock), SmoothTokenBucket::new));
        let admitted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        (0..10)
                            .filter(|_| throttle.lock().unwrap().try_acquire(Duration::from_secs(1)).is_ok())
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum::<usize>()
        });
        // ten one-second borrowers at 10% each, then the rate is down to zero
        assert_eq!(10, admitted);
    }

    #[test]
    fn acquire_blocking_waits() {
        let mut throttle = Throttle::new(SimpleTokenBucket::new);
        assert_eq!(Duration::ZERO, throttle.acquire_blocking(20 * MS));
        let started = Instant::now();
        let waited = throttle.acquire_blocking(MS);
        assert!(waited >= 19 * MS, "waited {waited:?}");
        assert!(started.elapsed() >= 19 * MS);
    }

    #[test]
    fn acquire_blocking_admits_without_sleeping() {
        // a frozen clock only returns if nothing has to be waited for
        let clock = ManualClock::default();
        let mut throttle = Throttle::with_clock(&clock, |now| BurstTokenBucket::new(now, 5 * MS));
        for _ in 0..6 {
            assert_eq!(Duration::ZERO, throttle.acquire_blocking(MS));
        }
        assert!(!throttle.check(MS).is_zero());
    }
}
