use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

/// The bucket did not admit the request.
///
/// Nothing was consumed; the caller may retry no earlier than
/// [`earliest_retry_after`](Self::earliest_retry_after) from now.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub(crate) earliest_retry_after: Duration,
}

impl RateLimited {
    /// The suggested duration to wait before retrying.
    pub fn earliest_retry_after(&self) -> Duration {
        self.earliest_retry_after
    }
}

impl Debug for RateLimited {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rate limited; suggested nap duration is {:?}",
            self.earliest_retry_after
        )
    }
}

impl Display for RateLimited {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// A bucket configuration that cannot be honoured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// The nominal rate is not a positive, finite number of events per second,
    /// or a single event would cost less than a nanosecond or more than
    /// `Duration::MAX`.
    InvalidRate(f64),
    /// The smoothing adjustment step must lie in `(0, 1]`.
    InvalidAdjustmentStep(f64),
    /// The minimum rate must lie in `(0, adjustment_step)`.
    InvalidMinRate(f64),
    /// The span buffer cannot hold every span the smoothing step can produce.
    CapacityTooSmall { capacity: usize, required: usize },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidRate(rate) => write!(
                f,
                "rate must be a positive, finite number of events per second, got {rate}"
            ),
            ConfigError::InvalidAdjustmentStep(step) => {
                write!(f, "adjustment step must be within (0, 1], got {step}")
            }
            ConfigError::InvalidMinRate(min_rate) => write!(
                f,
                "minimum rate must be positive and below the adjustment step, got {min_rate}"
            ),
            ConfigError::CapacityTooSmall { capacity, required } => write!(
                f,
                "span capacity of {capacity} is too small, at least {required} spans are needed"
            ),
        }
    }
}

impl std::error::Error for RateLimited {}
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rate_limited() {
        let rl = RateLimited {
            earliest_retry_after: Duration::from_secs(10),
        };
        assert_eq!(
            "rate limited; suggested nap duration is 10s",
            rl.to_string()
        );
    }

    #[test]
    fn display_config_error() {
        assert_eq!(
            "adjustment step must be within (0, 1], got 1.5",
            ConfigError::InvalidAdjustmentStep(1.5).to_string()
        );
        assert_eq!(
            "span capacity of 4 is too small, at least 13 spans are needed",
            ConfigError::CapacityTooSmall {
                capacity: 4,
                required: 13
            }
            .to_string()
        );
    }
}
