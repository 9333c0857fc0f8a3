use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use likely_stable::unlikely;
use tracing::trace;

use crate::{ConfigError, Smoothing, Timestamp, TokenBucket};

/// A refill rate, as a fraction of the nominal rate, that applies up to (but
/// excluding) `end_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSpan {
    pub rate_multiplier: f64,
    /// [`Timestamp::FAR_FUTURE`] for the trailing full-rate span.
    pub end_time: Timestamp,
}

impl RateSpan {
    const fn new(rate_multiplier: f64, end_time: Timestamp) -> Self {
        Self {
            rate_multiplier,
            end_time,
        }
    }
}

/// A token bucket that borrows from the future by lowering its refill rate
/// instead of blocking.
///
/// A [`SimpleTokenBucket`](crate::SimpleTokenBucket) that admits a large
/// request makes every later caller wait for that request's full cost
/// (head-of-line blocking). This bucket instead spreads each request over a
/// longer window: admitting `d` lowers the future refill rate by
/// `adjustment_step` (10% of nominal by default) for as long as it takes to
/// collect `d`, i.e. about `d / adjustment_step`. Up to
/// [`Smoothing::max_borrowers`] requests can repay at the same time; callers
/// are only told to wait once the refill rate has dropped to zero.
///
/// Outstanding debt is a ring of [`RateSpan`]s. The span at `head` always has
/// a zero rate and ends at the instant requests are let through again; the
/// last span has the full rate and never ends. Rates never decrease from the
/// head to the tail.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use timebucket::{SmoothTokenBucket, Timestamp};
///
/// let t0 = Timestamp::ZERO;
/// let mut bucket = SmoothTokenBucket::new(t0);
///
/// // a one second request does not block the next caller...
/// assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0, Duration::from_secs(1)));
/// assert_eq!(Duration::ZERO, bucket.try_get_tokens(t0, Duration::from_millis(1)));
/// // ...it is repaid over the next ten seconds instead
/// assert_eq!(t0, bucket.zero_time());
/// ```
pub struct SmoothTokenBucket {
    spans: Box<[RateSpan]>,
    head: usize,
    last_now: Timestamp,
    smoothing: Smoothing,
}

impl SmoothTokenBucket {
    /// Creates a bucket with the default [`Smoothing`].
    pub fn new(now: Timestamp) -> Self {
        Self::from_smoothing(now, Smoothing::new())
    }

    /// Creates a bucket with custom smoothing, rejecting configurations whose
    /// span buffer could overflow.
    pub fn with_smoothing(now: Timestamp, smoothing: Smoothing) -> Result<Self, ConfigError> {
        smoothing.validate()?;
        Ok(Self::from_smoothing(now, smoothing))
    }

    fn from_smoothing(now: Timestamp, smoothing: Smoothing) -> Self {
        let mut spans = vec![RateSpan::new(0.0, now); smoothing.capacity].into_boxed_slice();
        spans[1] = RateSpan::new(1.0, Timestamp::FAR_FUTURE);
        Self {
            spans,
            head: 0,
            last_now: now,
            smoothing,
        }
    }

    /// Attempts to take `amount` worth of time from the bucket.
    ///
    /// Returns [`Duration::ZERO`] if the request is admitted, otherwise the
    /// delay until the zero-rate window at the head ends. Zero-cost requests
    /// are always admitted and leave the bucket untouched.
    ///
    /// # Panics
    ///
    /// If `now` is earlier than the `now` of a previous call, or if the span
    /// state is found corrupted.
    pub fn try_get_tokens(&mut self, now: Timestamp, amount: Duration) -> Duration {
        assert!(
            now >= self.last_now && !now.is_far_future(),
            "time went backwards or out of range: {now} after {}",
            self.last_now
        );
        if amount.is_zero() {
            return Duration::ZERO;
        }
        self.last_now = now;

        let head = self.spans[self.head];
        if now < head.end_time {
            assert!(
                head.rate_multiplier.abs() < self.smoothing.min_rate,
                "head span must block, found {head:?}"
            );
            return head.end_time - now;
        }
        self.release_elapsed(now);
        self.borrow(now, amount);
        Duration::ZERO
    }

    /// The instant at which the zero-rate window ends and requests are let
    /// through again.
    pub fn zero_time(&self) -> Timestamp {
        self.spans[self.head].end_time
    }

    pub fn smoothing(&self) -> &Smoothing {
        &self.smoothing
    }

    /// Drops every span that ended by `now` and makes `now` the end of the
    /// zero-rate head span.
    fn release_elapsed(&mut self, now: Timestamp) {
        let mut idx = self.next(self.head);
        // stops at the trailing span at the latest
        while self.spans[idx].end_time <= now {
            idx = self.next(idx);
        }
        self.head = self.prev(idx);
        self.spans[self.head] = RateSpan::new(0.0, now);
    }

    /// Lowers the refill rate, starting at `now`, until `amount` is collected.
    fn borrow(&mut self, now: Timestamp, amount: Duration) {
        let Smoothing {
            adjustment_step,
            min_rate,
            ..
        } = self.smoothing;
        let mut remaining = u64::try_from(amount.as_nanos()).unwrap_or(u64::MAX);
        let mut span_start = now;
        let mut idx = self.next(self.head);

        for _ in 0..self.spans.len() {
            let span = self.spans[idx];
            assert!(
                span.rate_multiplier >= min_rate && span.rate_multiplier <= 1.0,
                "span after the head must have a positive rate, found {span:?}"
            );
            let step = adjustment_step.min(span.rate_multiplier);
            // time it takes to collect what is left at this step
            let needed = (remaining as f64 / step).round() as u64;
            let span_len = duration_as_u64_nanos(span.end_time - span_start);

            if span.end_time.is_far_future() || needed < span_len {
                let split_end = (span_start + Duration::from_nanos(needed))
                    .min(Timestamp::from_nanos(i64::MAX - 1));
                self.split(idx, split_end, step);
                return;
            }

            // the whole span is needed
            let collected = (step * span_len as f64).round() as u64;
            remaining = remaining.saturating_sub(collected);
            let rate = reduce(span.rate_multiplier, step, min_rate);
            self.spans[idx].rate_multiplier = rate;
            if rate == 0.0 {
                trace!(zero_time = %span.end_time, "rate span fully borrowed");
                self.head = idx;
            }
            if remaining == 0 {
                return;
            }
            span_start = span.end_time;
            idx = self.next(idx);
        }
        panic!("span walk did not reach the trailing span: {self}");
    }

    /// Splits the span at `idx` at `split_end`: the earlier part has its rate
    /// lowered by `step`, the later part keeps the original rate and extent.
    /// Every following span moves one slot later.
    fn split(&mut self, idx: usize, split_end: Timestamp, step: f64) {
        let original = self.spans[idx];
        debug_assert!(split_end < original.end_time);
        let rate = reduce(original.rate_multiplier, step, self.smoothing.min_rate);
        self.spans[idx] = RateSpan::new(rate, split_end);
        trace!(%split_end, rate, "split rate span");

        let mut carry = original;
        let mut slot = idx;
        loop {
            slot = self.next(slot);
            if unlikely(slot == self.head) {
                panic!("rate span buffer overflow: {self}");
            }
            let displaced = std::mem::replace(&mut self.spans[slot], carry);
            if carry.end_time.is_far_future() {
                break;
            }
            carry = displaced;
        }
        if rate == 0.0 {
            self.head = idx;
        }
    }

    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.spans.len()
    }

    fn prev(&self, idx: usize) -> usize {
        (idx + self.spans.len() - 1) % self.spans.len()
    }

    /// Spans from the head up to and including the trailing one.
    fn live_spans(&self) -> impl Iterator<Item = RateSpan> + '_ {
        let mut idx = Some(self.head);
        std::iter::from_fn(move || {
            let current = idx?;
            let span = self.spans[current];
            idx = (!span.end_time.is_far_future()).then(|| self.next(current));
            Some(span)
        })
    }
}

/// `rate - step`, snapped to zero once the span is spent.
fn reduce(rate: f64, step: f64, min_rate: f64) -> f64 {
    let reduced = rate - step;
    if reduced < min_rate { 0.0 } else { reduced }
}

fn duration_as_u64_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl TokenBucket for SmoothTokenBucket {
    type Cost = Duration;

    fn try_get_tokens(&mut self, now: Timestamp, amount: Duration) -> Duration {
        SmoothTokenBucket::try_get_tokens(self, now, amount)
    }
}

impl Debug for SmoothTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SmoothTokenBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let zero_time = self.zero_time();
        write!(
            f,
            "SmoothTokenBucket(head={}, zero_time={zero_time}, spans=[",
            self.head
        )?;
        for (i, span) in self.live_spans().skip(1).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if span.end_time.is_far_future() {
                write!(f, "{} forever", span.rate_multiplier)?;
            } else {
                write!(
                    f,
                    "{} for {:?}",
                    span.rate_multiplier,
                    span.end_time - zero_time
                )?;
            }
        }
        write!(f, "])")
    }
}

/// Read-only view of a [`SmoothTokenBucket`]'s spans, for tests only.
#[cfg(any(test, feature = "test-util"))]
pub struct SpanIntrospector<'a> {
    bucket: &'a SmoothTokenBucket,
}

#[cfg(any(test, feature = "test-util"))]
impl SpanIntrospector<'_> {
    /// The live spans, starting with the zero-rate head and ending with the
    /// full-rate span that never ends.
    pub fn spans(&self) -> Vec<RateSpan> {
        self.bucket.live_spans().collect()
    }

    /// Slot of the head span in the ring.
    pub fn head(&self) -> usize {
        self.bucket.head
    }
}

#[cfg(any(test, feature = "test-util"))]
impl SmoothTokenBucket {
    pub fn introspect(&self) -> SpanIntrospector<'_> {
        SpanIntrospector { bucket: self }
    }
}
