mod stream;

pub use stream::RateLimitedStream;

use futures::Stream;

use crate::{Clock, Throttle, TokenBucket};

pub trait RateLimitedStreamExt: Stream + Sized {
    /// Delays each item until `throttle` admits its cost, as computed by
    /// `cost_fn`.
    fn rate_limit<B, C, F>(self, throttle: Throttle<B, C>, cost_fn: F) -> RateLimitedStream<Self, B, C, F>
    where
        B: TokenBucket,
        C: Clock,
        F: Fn(&Self::Item) -> B::Cost;
}

impl<S: Stream> RateLimitedStreamExt for S {
    fn rate_limit<B, C, F>(self, throttle: Throttle<B, C>, cost_fn: F) -> RateLimitedStream<Self, B, C, F>
    where
        B: TokenBucket,
        C: Clock,
        F: Fn(&Self::Item) -> B::Cost,
    {
        RateLimitedStream::new(self, throttle, cost_fn)
    }
}
