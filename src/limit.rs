use std::num::NonZeroU32;
use std::time::Duration;

use crate::ConfigError;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// A nominal event rate, in events per second.
///
/// Used by [`RateTokenBucket`](crate::RateTokenBucket) to turn token counts
/// into time costs: every event costs `1s / rate`.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU32;
/// use std::time::Duration;
/// use timebucket::Rate;
///
/// let rate = Rate::per_second(NonZeroU32::new(10_000).unwrap());
/// assert_eq!(Duration::from_micros(100), rate.duration_per_token());
///
/// // 60 events per minute is one per second
/// let rate = Rate::per_minute(NonZeroU32::new(60).unwrap());
/// assert_eq!(1.0, rate.rate_per_second());
///
/// assert!(Rate::new(-1.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct Rate {
    pub(crate) rate: f64,
}

impl std::fmt::Debug for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rate(per_second={})", self.rate)
    }
}

impl Rate {
    /// Creates a rate from a real number of events per second.
    ///
    /// Fails unless the rate is positive and finite, and a single event costs
    /// between one nanosecond and `Duration::MAX`.
    pub fn new(per_second: f64) -> Result<Self, ConfigError> {
        if !per_second.is_finite() || per_second <= 0.0 {
            return Err(ConfigError::InvalidRate(per_second));
        }
        match Duration::try_from_secs_f64(1.0 / per_second) {
            Ok(cost) if cost >= Duration::from_nanos(1) => Ok(Self { rate: per_second }),
            _ => Err(ConfigError::InvalidRate(per_second)),
        }
    }

    /// Creates a rate with the specified events per second.
    pub const fn per_second(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64,
        }
    }

    /// Creates a rate with the specified events per minute.
    pub const fn per_minute(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64 / SECONDS_PER_MINUTE,
        }
    }

    /// Creates a rate with the specified events per hour.
    pub const fn per_hour(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64 / SECONDS_PER_HOUR,
        }
    }

    /// Returns the rate in events per second.
    pub const fn rate_per_second(&self) -> f64 {
        self.rate
    }

    /// Returns the rate in events per minute.
    pub const fn rate_per_minute(&self) -> f64 {
        self.rate * SECONDS_PER_MINUTE
    }

    /// Returns the rate in events per hour.
    pub const fn rate_per_hour(&self) -> f64 {
        self.rate * SECONDS_PER_HOUR
    }

    /// The time cost of a single event, never less than one nanosecond.
    pub fn duration_per_token(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate).max(Duration::from_nanos(1))
    }
}

impl TryFrom<f64> for Rate {
    type Error = ConfigError;

    fn try_from(per_second: f64) -> Result<Self, Self::Error> {
        Rate::new(per_second)
    }
}

/// Tuning knobs of the [`SmoothTokenBucket`](crate::SmoothTokenBucket).
///
/// Every admitted request lowers the refill rate by `adjustment_step` (a
/// fraction of the nominal rate) for as long as it takes to pay the request
/// back, so at most [`max_borrowers`](Self::max_borrowers) requests can be
/// repaying at the same instant. The bucket keeps its rate spans in a ring of
/// `capacity` slots; a rate that falls below `min_rate` counts as zero.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU32;
/// use timebucket::Smoothing;
///
/// let smoothing = Smoothing::default();
/// assert_eq!(16, smoothing.capacity());
/// assert_eq!(10, smoothing.max_borrowers());
///
/// // a finer step allows more requests to repay concurrently
/// let smoothing = Smoothing::with_max_borrowers(NonZeroU32::new(20).unwrap());
/// assert_eq!(0.05, smoothing.adjustment_step());
/// assert_eq!(23, smoothing.capacity());
/// assert!(smoothing.validate().is_ok());
///
/// assert!(Smoothing::default().with_capacity(4).validate().is_err());
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub(crate) capacity: usize,
    pub(crate) adjustment_step: f64,
    pub(crate) min_rate: f64,
}

impl std::fmt::Debug for Smoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Smoothing(capacity={}, adjustment_step={}, min_rate={})",
            self.capacity, self.adjustment_step, self.min_rate
        )
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::new()
    }
}

impl Smoothing {
    pub const DEFAULT_CAPACITY: usize = 16;
    pub const DEFAULT_ADJUSTMENT_STEP: f64 = 0.1;
    pub const DEFAULT_MIN_RATE: f64 = 0.0001;

    /// Spans beyond one per concurrent borrower: the zero-rate head, the slot
    /// freed by a head that is about to move, and one for rounding slack.
    const SPARE_SPANS: usize = 3;

    /// The default smoothing: 16 span slots, steps of 10% of the nominal rate.
    pub const fn new() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            adjustment_step: Self::DEFAULT_ADJUSTMENT_STEP,
            min_rate: Self::DEFAULT_MIN_RATE,
        }
    }

    /// Smoothing that lets up to `borrowers` requests repay concurrently,
    /// each one taking `1 / borrowers` of the nominal rate. The capacity grows
    /// past the default when needed.
    pub fn with_max_borrowers(borrowers: NonZeroU32) -> Self {
        let borrowers = borrowers.get();
        let adjustment_step = 1.0 / borrowers as f64;
        Self {
            capacity: Self::DEFAULT_CAPACITY.max(borrowers as usize + Self::SPARE_SPANS),
            adjustment_step,
            min_rate: Self::DEFAULT_MIN_RATE.min(adjustment_step / 1000.0),
        }
    }

    /// Sets the number of span slots.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the fraction of the nominal rate each admitted request borrows.
    pub const fn with_adjustment_step(mut self, adjustment_step: f64) -> Self {
        self.adjustment_step = adjustment_step;
        self
    }

    /// Sets the rate below which a span counts as fully spent.
    pub const fn with_min_rate(mut self, min_rate: f64) -> Self {
        self.min_rate = min_rate;
        self
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn adjustment_step(&self) -> f64 {
        self.adjustment_step
    }

    pub const fn min_rate(&self) -> f64 {
        self.min_rate
    }

    /// The number of requests that can be repaying at the same instant.
    pub fn max_borrowers(&self) -> usize {
        let steps = 1.0 / self.adjustment_step;
        // 1 / (1 / 3) is a hair above 3
        if (steps - steps.round()).abs() < 1e-9 {
            steps.round() as usize
        } else {
            steps.ceil() as usize
        }
    }

    /// Checks that the buffer can hold every span this smoothing can produce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let step = self.adjustment_step;
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(ConfigError::InvalidAdjustmentStep(step));
        }
        if !self.min_rate.is_finite() || self.min_rate <= 0.0 || self.min_rate >= step {
            return Err(ConfigError::InvalidMinRate(self.min_rate));
        }
        let required = self.max_borrowers() + Self::SPARE_SPANS;
        if self.capacity < required {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;

    use super::*;

    #[test]
    fn rates() {
        let rate = Rate::per_hour(nonzero!(3600u32));
        assert_eq!(1.0, rate.rate_per_second());
        assert_eq!(3600.0, rate.rate_per_hour());
        assert_eq!(Duration::from_secs(1), rate.duration_per_token());

        let rate = Rate::try_from(4.0).unwrap();
        assert_eq!(240.0, rate.rate_per_minute());
        assert_eq!(Duration::from_millis(250), rate.duration_per_token());
    }

    #[test]
    fn invalid_rates() {
        assert_eq!(Err(ConfigError::InvalidRate(0.0)), Rate::new(0.0));
        assert!(Rate::new(f64::NAN).is_err());
        assert!(Rate::new(f64::INFINITY).is_err());
        // an event would cost less than a nanosecond
        assert!(Rate::new(1e10).is_err());
        // an event would cost more than Duration::MAX
        assert!(Rate::new(1e-300).is_err());
    }

    #[test]
    fn default_smoothing_is_valid() {
        let smoothing = Smoothing::default();
        assert_eq!(Smoothing::new(), smoothing);
        assert!(smoothing.validate().is_ok());
        assert_eq!(10, smoothing.max_borrowers());
        assert_eq!(0.0001, smoothing.min_rate());
    }

    #[test]
    fn borrowers() {
        let smoothing = Smoothing::with_max_borrowers(nonzero!(3u32));
        assert_eq!(3, smoothing.max_borrowers());
        assert_eq!(16, smoothing.capacity());
        assert!(smoothing.validate().is_ok());

        let smoothing = Smoothing::with_max_borrowers(nonzero!(100_000u32));
        assert_eq!(100_003, smoothing.capacity());
        assert!(smoothing.min_rate() < smoothing.adjustment_step());
        assert!(smoothing.validate().is_ok());

        // steps that don't divide the nominal rate round the borrower count up
        let smoothing = Smoothing::new().with_adjustment_step(0.3);
        assert_eq!(4, smoothing.max_borrowers());
    }

    #[test]
    fn invalid_smoothing() {
        assert_eq!(
            Err(ConfigError::InvalidAdjustmentStep(0.0)),
            Smoothing::new().with_adjustment_step(0.0).validate()
        );
        assert!(Smoothing::new().with_adjustment_step(1.5).validate().is_err());
        assert_eq!(
            Err(ConfigError::InvalidMinRate(0.2)),
            Smoothing::new().with_min_rate(0.2).validate()
        );
        assert_eq!(
            Err(ConfigError::CapacityTooSmall {
                capacity: 12,
                required: 13
            }),
            Smoothing::new().with_capacity(12).validate()
        );
        assert!(Smoothing::new().with_capacity(13).validate().is_ok());
    }
}
