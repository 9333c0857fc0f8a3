use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

/// A point on a bucket's timeline, in nanoseconds since an arbitrary epoch.
///
/// Buckets never read a clock themselves: every admission call is handed the
/// current `Timestamp` by the caller, which makes the buckets fully
/// deterministic for a given sequence of calls.
///
/// Timestamps may be negative (a burst bucket shifts its origin into the past),
/// and [`Timestamp::FAR_FUTURE`] stands for "+infinity". `FAR_FUTURE` absorbs
/// any duration added to or subtracted from it.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use timebucket::Timestamp;
///
/// let t0 = Timestamp::from_secs_f64(3600.0);
/// let t1 = t0 + Duration::from_millis(50);
/// assert_eq!(Duration::from_millis(50), t1 - t0);
/// // subtraction saturates at zero
/// assert_eq!(Duration::ZERO, t0 - t1);
/// assert!(t1 < Timestamp::FAR_FUTURE);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The epoch.
    pub const ZERO: Timestamp = Timestamp(0);
    /// A timestamp later than every other timestamp.
    pub const FAR_FUTURE: Timestamp = Timestamp(i64::MAX);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        // `as` saturates on overflow and maps NaN to zero.
        Self((secs * 1e9).round() as i64)
    }

    pub fn as_secs_f64(&self) -> f64 {
        if self.is_far_future() {
            f64::INFINITY
        } else {
            self.0 as f64 / 1e9
        }
    }

    pub const fn is_far_future(&self) -> bool {
        self.0 == i64::MAX
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        if self.0 <= earlier.0 {
            return Duration::ZERO;
        }
        // the difference of two i64 always fits in u64 when positive
        Duration::from_nanos(self.0.wrapping_sub(earlier.0) as u64)
    }
}

fn duration_as_i64_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

impl From<Duration> for Timestamp {
    /// The timestamp `d` after the epoch.
    fn from(d: Duration) -> Self {
        Timestamp::ZERO + d
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        if self.is_far_future() {
            return self;
        }
        Timestamp(self.0.saturating_add(duration_as_i64_nanos(rhs)))
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        if self.is_far_future() {
            return self;
        }
        Timestamp(self.0.saturating_sub(duration_as_i64_nanos(rhs)))
    }
}

impl SubAssign<Duration> for Timestamp {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    /// Saturates at zero, like [`std::time::Instant`].
    fn sub(self, rhs: Timestamp) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_far_future() {
            return write!(f, "+inf");
        }
        let offset = Duration::from_nanos(self.0.unsigned_abs());
        if self.0 < 0 {
            write!(f, "-{offset:?}")
        } else {
            write!(f, "+{offset:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let t = Timestamp::from_nanos(1_000);
        assert_eq!(Timestamp::from_nanos(1_500), t + Duration::from_nanos(500));
        assert_eq!(Timestamp::from_nanos(-2_000), t - Duration::from_micros(3));
        assert_eq!(Duration::from_nanos(500), (t + Duration::from_nanos(500)) - t);
        assert_eq!(Duration::ZERO, t - (t + Duration::from_nanos(1)));

        let mut u = t;
        u += Duration::from_secs(1);
        u -= Duration::from_millis(500);
        assert_eq!(Duration::from_millis(500), u - t);
    }

    #[test]
    fn far_future_absorbs() {
        let inf = Timestamp::FAR_FUTURE;
        assert_eq!(inf, inf + Duration::from_secs(10));
        assert_eq!(inf, inf - Duration::from_secs(10));
        assert!(inf.is_far_future());
        assert_eq!(f64::INFINITY, inf.as_secs_f64());
        // saturates instead of wrapping
        let near = Timestamp::from_nanos(i64::MAX - 10);
        assert_eq!(inf, near + Duration::from_secs(1));
        assert_eq!(
            Timestamp::from_nanos(i64::MIN),
            Timestamp::from_nanos(i64::MIN + 10) - Duration::from_secs(1)
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(
            Timestamp::from_nanos(3_600_000_000_000),
            Timestamp::from_secs_f64(3600.0)
        );
        assert_eq!(1.5, Timestamp::from_secs_f64(1.5).as_secs_f64());
        assert_eq!(
            Timestamp::from_nanos(2_000_000),
            Timestamp::from(Duration::from_millis(2))
        );
        let wide = Timestamp::ZERO.saturating_duration_since(Timestamp::from_nanos(i64::MIN));
        assert_eq!(Duration::from_nanos(1u64 << 63), wide);
    }

    #[test]
    fn display() {
        assert_eq!("+inf", Timestamp::FAR_FUTURE.to_string());
        assert_eq!("+10ms", Timestamp::from_nanos(10_000_000).to_string());
        assert_eq!("-3ms", Timestamp::from_nanos(-3_000_000).to_string());
    }
}
