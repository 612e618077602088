//! Global admission middleware
//!
//! Every request, whatever its route or caller, spends one token from the
//! shared bucket before any handler runs. An empty bucket answers `429`
//! immediately.

use super::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use stockroom::Admission;

pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Body of a `429` response
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitedBody {
    pub error: String,
    /// Human-readable wait, e.g. `"1 second"`
    pub retry_after: String,
}

pub async fn admit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.gate.check() {
        Admission::Admitted => {
            let start = Instant::now();
            let response = next.run(request).await;
            state
                .metrics
                .record_admitted(start.elapsed().as_micros() as u64);
            response
        }
        Admission::RateLimited { retry_after } => {
            state.metrics.record_rate_limited();
            tracing::debug!(
                "Rejected {} {}: global rate limit",
                request.method(),
                request.uri().path()
            );
            rate_limited(retry_after)
        }
    }
}

pub fn rate_limited(retry_after: Duration) -> Response {
    let body = RateLimitedBody {
        error: RATE_LIMITED_MESSAGE.to_string(),
        retry_after: describe_wait(retry_after),
    };
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
    response
}

/// Whole seconds for the `Retry-After` header, rounded up, at least 1
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// `"1 second"`, `"3 seconds"`, or milliseconds for fractional waits
pub fn describe_wait(wait: Duration) -> String {
    if wait.subsec_nanos() == 0 && wait.as_secs() > 0 {
        return plural(wait.as_secs(), "second");
    }
    let millis = wait.as_nanos().div_ceil(1_000_000).max(1);
    plural(millis as u64, "millisecond")
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
