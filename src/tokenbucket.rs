use std::time::Duration;

use crate::Timestamp;

/// An admission-control primitive driven by caller-supplied time.
///
/// `try_get_tokens` either admits the request, returning [`Duration::ZERO`],
/// or returns how long the caller must wait before retrying. A rejected call
/// leaves no reservation behind: whether or not the caller ever retries does
/// not affect the bucket.
///
/// Implementations are plain state machines without internal synchronization.
/// `now` must not decrease between calls on the same bucket.
pub trait TokenBucket {
    /// What a request costs: a duration of nominal capacity, or a number of
    /// events for rate based buckets.
    type Cost: Copy;

    fn try_get_tokens(&mut self, now: Timestamp, cost: Self::Cost) -> Duration;
}
