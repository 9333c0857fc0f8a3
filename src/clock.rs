use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::Timestamp;

/// Trait for monotonic clock implementations used to drive token buckets.
///
/// The buckets themselves never read a clock; a [`Throttle`](crate::Throttle)
/// asks its clock for the current [`Timestamp`] on every admission call.
/// The smoother panics if it sees time go backwards, so implementations must
/// be monotonic.
pub trait Clock {
    /// Returns the current time relative to an arbitrary epoch.
    ///
    /// Nanosecond resolution is kept, though coarser clocks work too.
    fn now(&self) -> Timestamp;
}

/// Time since construction, read from [`std::time::Instant`].
///
/// Precise, but every read is a syscall on some platforms; see `FastClock`
/// for a cheaper, coarser alternative.
///
/// # Examples
///
/// ```rust
/// use timebucket::{SimpleTokenBucket, StdClock, Throttle};
///
/// let throttle = Throttle::with_clock(StdClock::default(), SimpleTokenBucket::new);
/// ```
#[derive(Clone)]
pub struct StdClock {
    origin: std::time::Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.origin.elapsed())
    }
}

/// Time since construction, read from a `quanta` TSC clock.
///
/// Requires the "quanta" feature to be enabled.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "quanta")]
/// # {
/// use timebucket::{QuantaClock, RateTokenBucket, Rate, Throttle};
/// use std::num::NonZeroU32;
///
/// let rate = Rate::per_second(NonZeroU32::new(100).unwrap());
/// let throttle = Throttle::with_clock(QuantaClock::default(), |now| {
///     RateTokenBucket::new(now, rate)
/// });
/// # }
/// ```
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct QuantaClock {
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for QuantaClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl QuantaClock {
    /// Starts counting from the current reading of `clock`.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.now();
        Self { origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for QuantaClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.origin.elapsed())
    }
}

/// Time since construction, read from [`tokio::time::Instant`].
///
/// Follows tokio's paused test time, which makes it the clock of choice for
/// rate limited streams under `#[tokio::test(start_paused = true)]`.
/// Requires the "tokio" feature.
#[cfg(feature = "tokio")]
#[derive(Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

#[cfg(feature = "tokio")]
impl Default for TokioClock {
    fn default() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "tokio")]
impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.origin.elapsed())
    }
}

/// Time since construction, from quanta's cached `recent()` reading.
///
/// Significantly cheaper to read than [`StdClock`], with precision limited by
/// how often quanta's upkeep thread runs. Requires the "quanta" feature.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "quanta")]
/// # {
/// use timebucket::{FastClock, SimpleTokenBucket, Throttle};
///
/// let throttle = Throttle::with_clock(FastClock::default(), SimpleTokenBucket::new);
/// # }
/// ```
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct FastClock {
    clock: quanta::Clock,
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for FastClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl FastClock {
    /// Starts counting from the last cached reading of `clock`.
    ///
    /// **Important**: Ensure the clock's upkeep thread is running, otherwise
    /// the bucket will not observe clock changes and every caller after the
    /// first one is told to wait.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.recent();
        Self { clock, origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for FastClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.clock.recent() - self.origin)
    }
}

/// A clock that only moves when told to.
///
/// Time only moves when told to, which makes admission decisions fully
/// reproducible. The clock is thread-safe and can be shared across threads.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use timebucket::{ManualClock, SimpleTokenBucket, Throttle};
///
/// let clock = Arc::new(ManualClock::default());
/// let mut throttle = Throttle::with_clock(Arc::clone(&clock), SimpleTokenBucket::new);
///
/// // the first request always goes through
/// assert!(throttle.try_acquire(Duration::from_millis(10)).is_ok());
/// assert!(throttle.try_acquire(Duration::from_millis(10)).is_err());
///
/// clock.advance(Duration::from_millis(10));
/// assert!(throttle.try_acquire(Duration::from_millis(10)).is_ok());
/// ```
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}

impl ManualClock {
    /// A clock reading `now` until it is moved.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jumps to `now`. Moving backwards is allowed here, but a smoother
    /// driven by this clock will panic on its next call.
    pub fn set(&self, now: Timestamp) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }

    fn read(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.read()
    }
}

impl Clock for &ManualClock {
    fn now(&self) -> Timestamp {
        self.read()
    }
}

impl Clock for Arc<ManualClock> {
    fn now(&self) -> Timestamp {
        self.read()
    }
}
