//! Process-wide admission control
//!
//! The [`AdmissionGate`] owns the single [`TokenBucket`] of a server process.
//! It is created by the composition root and handed to the request path by
//! reference; there is no global instance.

use super::bucket::TokenBucket;
use std::time::{Duration, Instant};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed unmodified
    Admitted,
    /// The request must be rejected before it reaches a handler
    RateLimited {
        /// Advisory wait, always one refill interval
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// One global quota for every inbound request
///
/// The gate ignores who is calling and which route is hit. A check costs a
/// single lock acquisition on the bucket and performs no I/O.
///
/// # Example
///
/// ```
/// use stockroom::{Admission, AdmissionGate, TokenBucket};
/// use std::time::Duration;
///
/// let gate = AdmissionGate::new(TokenBucket::new(1, Duration::from_secs(1)).unwrap());
///
/// assert_eq!(gate.check(), Admission::Admitted);
/// assert_eq!(
///     gate.check(),
///     Admission::RateLimited { retry_after: Duration::from_secs(1) }
/// );
/// ```
#[derive(Debug)]
pub struct AdmissionGate {
    bucket: TokenBucket,
}

impl AdmissionGate {
    pub fn new(bucket: TokenBucket) -> Self {
        AdmissionGate { bucket }
    }

    /// Admit or reject one request
    pub fn check(&self) -> Admission {
        self.decide(self.bucket.allow())
    }

    /// Admit or reject one request as of `now`
    pub fn check_at(&self, now: Instant) -> Admission {
        self.decide(self.bucket.allow_at(now))
    }

    /// The advisory retry interval handed out on rejection
    pub fn retry_after(&self) -> Duration {
        self.bucket.refill_interval()
    }

    pub fn capacity(&self) -> u32 {
        self.bucket.capacity()
    }

    fn decide(&self, allowed: bool) -> Admission {
        if allowed {
            Admission::Admitted
        } else {
            Admission::RateLimited {
                retry_after: self.retry_after(),
            }
        }
    }
}
