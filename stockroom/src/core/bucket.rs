//! Token bucket rate limiter
//!
//! A bucket holds up to `capacity` tokens and gains one token per elapsed
//! `refill_interval`. Refill happens lazily on each call, there is no timer.

use super::BucketError;
use parking_lot::Mutex;
use std::time::{Duration, Instant};


/// Thread-safe token bucket
///
/// Each allowed call consumes one token. The refill, check and decrement run
/// as a single critical section, so concurrent callers can never spend the
/// same token twice.
///
/// Refill resets `last_refill` to the moment of the refill rather than
/// advancing it by whole intervals. Any sub-interval remainder is lost, so
/// long-run throughput can sit slightly below `1 / refill_interval`.
///
/// # Example
///
/// ```
/// use stockroom::TokenBucket;
/// use std::time::Duration;
///
/// let bucket = TokenBucket::new(5, Duration::from_secs(1)).unwrap();
///
/// for _ in 0..5 {
///     assert!(bucket.allow());
/// }
/// assert!(!bucket.allow());
/// ```
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    ///
    /// # Errors
    ///
    /// - [`BucketError::ZeroCapacity`] if `capacity` is zero
    /// - [`BucketError::ZeroRefillInterval`] if `refill_interval` is zero
    pub fn new(capacity: u32, refill_interval: Duration) -> Result<Self, BucketError> {
        Self::new_at(capacity, refill_interval, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`
    pub fn new_at(
        capacity: u32,
        refill_interval: Duration,
        now: Instant,
    ) -> Result<Self, BucketError> {
        if capacity == 0 {
            return Err(BucketError::ZeroCapacity);
        }
        if refill_interval.is_zero() {
            return Err(BucketError::ZeroRefillInterval);
        }

        Ok(TokenBucket {
            capacity,
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        })
    }

    /// Try to take one token using the monotonic clock
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Try to take one token as of `now`
    ///
    /// A `now` earlier than the last refill counts as zero elapsed time.
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();

        let elapsed = now.saturating_duration_since(state.last_refill);
        let intervals = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if intervals > 0 {
            let missing = self.capacity - state.tokens;
            let refill = intervals.min(missing as u128) as u32;
            state.tokens += refill;
            state.last_refill = now;
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }
}
