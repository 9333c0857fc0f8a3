use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use pin_project_lite::pin_project;

use crate::{Clock, Throttle, TokenBucket};

#[cfg(not(feature = "tokio-hrtime"))]
use tokio::time::{Sleep, sleep};
#[cfg(feature = "tokio-hrtime")]
use tokio_hrtime::{Sleep, sleep};

pin_project! {
    /// A stream that holds back each item until its throttle admits it.
    ///
    /// Every item has a cost, given by `cost_fn`. When the bucket rejects an
    /// item, the stream sleeps for the suggested delay and asks again; the item
    /// is only yielded once admitted. Items are never reordered or dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use futures::{StreamExt, stream};
    /// use timebucket::futures::RateLimitedStream;
    /// use timebucket::{SimpleTokenBucket, Throttle, TokioClock};
    ///
    /// # async fn example() {
    /// let throttle = Throttle::with_clock(TokioClock::default(), SimpleTokenBucket::new);
    /// // 100ms per byte
    /// let stream = stream::iter(vec!["a", "bcd", "ef"]);
    /// let mut limited = std::pin::pin!(RateLimitedStream::new(stream, throttle, |s: &&str| {
    ///     Duration::from_millis(100) * s.len() as u32
    /// }));
    /// while let Some(s) = limited.next().await {
    ///     println!("{s}");
    /// }
    /// # }
    /// ```
    pub struct RateLimitedStream<S, B, C, F>
    where
        S: Stream,
        B: TokenBucket,
        C: Clock,
        F: Fn(&S::Item) -> B::Cost,
    {
        #[pin]
        stream: S,
        throttle: Throttle<B, C>,
        cost_fn: F,
        #[pin]
        delay: Option<Sleep>,
        pending_item: Option<S::Item>,
    }
}

impl<S, B, C, F> RateLimitedStream<S, B, C, F>
where
    S: Stream,
    B: TokenBucket,
    C: Clock,
    F: Fn(&S::Item) -> B::Cost,
{
    /// Creates a new rate-limited stream.
    ///
    /// # Arguments
    ///
    /// * `stream` - The underlying stream to rate limit
    /// * `throttle` - The bucket and clock deciding when items may pass
    /// * `cost_fn` - What each item costs the bucket
    pub fn new(stream: S, throttle: Throttle<B, C>, cost_fn: F) -> Self {
        Self {
            stream,
            throttle,
            cost_fn,
            delay: None,
            pending_item: None,
        }
    }

    pub fn throttle(&self) -> &Throttle<B, C> {
        &self.throttle
    }

    /// Returns the underlying stream and throttle. An item that was waiting
    /// for admission is dropped.
    pub fn into_inner(self) -> (S, Throttle<B, C>) {
        (self.stream, self.throttle)
    }
}

impl<S, B, C, F> Stream for RateLimitedStream<S, B, C, F>
where
    S: Stream,
    B: TokenBucket,
    C: Clock,
    F: Fn(&S::Item) -> B::Cost,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            // are we already waiting for a delay?
            if let Some(delay) = this.delay.as_mut().as_pin_mut() {
                ready!(delay.poll(cx));
                this.delay.set(None);
            }

            let cost = match this.pending_item.as_ref() {
                Some(item) => (this.cost_fn)(item),
                None => match ready!(this.stream.as_mut().poll_next(cx)) {
                    Some(item) => {
                        let cost = (this.cost_fn)(&item);
                        *this.pending_item = Some(item);
                        cost
                    }
                    None => return Poll::Ready(None),
                },
            };

            let wait = this.throttle.check(cost);
            if wait.is_zero() {
                return Poll::Ready(this.pending_item.take());
            }
            // polled on the next iteration, which registers the waker
            this.delay.set(Some(sleep(wait)));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = usize::from(self.pending_item.is_some());
        let (lower, upper) = self.stream.size_hint();
        (
            lower.saturating_add(pending),
            upper.and_then(|u| u.checked_add(pending)),
        )
    }
}
