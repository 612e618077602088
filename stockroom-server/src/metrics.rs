//! Simple metrics collection for observability
//!
//! Lightweight atomic counters for admission decisions, request latency and
//! the cache-aside layer. No allocations on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use stockroom::CacheObserver;

/// Core metrics collected by the server
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Total requests received
    pub total_requests: AtomicU64,

    /// Admission decisions
    pub requests_admitted: AtomicU64,
    pub requests_rate_limited: AtomicU64,

    /// Request latency buckets (in microseconds), admitted requests only
    pub latency_under_1ms: AtomicU64,
    pub latency_under_10ms: AtomicU64,
    pub latency_under_100ms: AtomicU64,
    pub latency_under_1s: AtomicU64,
    pub latency_over_1s: AtomicU64,

    /// Histogram support
    pub latency_sum_micros: AtomicU64,
    pub latency_count: AtomicU64,

    /// Cache-aside outcomes
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub cache_errors: AtomicU64,

    /// Durable store failures surfaced to callers
    pub store_errors: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            requests_admitted: AtomicU64::new(0),
            requests_rate_limited: AtomicU64::new(0),
            latency_under_1ms: AtomicU64::new(0),
            latency_under_10ms: AtomicU64::new(0),
            latency_under_100ms: AtomicU64::new(0),
            latency_under_1s: AtomicU64::new(0),
            latency_over_1s: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_errors: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    /// Record a request turned away by the admission gate
    pub fn record_rate_limited(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an admitted request and its handling latency
    pub fn record_admitted(&self, latency_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_admitted.fetch_add(1, Ordering::Relaxed);

        match latency_us {
            0..=999 => self.latency_under_1ms.fetch_add(1, Ordering::Relaxed),
            1000..=9999 => self.latency_under_10ms.fetch_add(1, Ordering::Relaxed),
            10000..=99999 => self.latency_under_100ms.fetch_add(1, Ordering::Relaxed),
            100000..=999999 => self.latency_under_1s.fetch_add(1, Ordering::Relaxed),
            _ => self.latency_over_1s.fetch_add(1, Ordering::Relaxed),
        };

        self.latency_sum_micros
            .fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Share of cache lookups that hit, in percent
    pub fn cache_hit_rate_percent(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let lookups = hits
            + self.cache_misses.load(Ordering::Relaxed)
            + self.cache_errors.load(Ordering::Relaxed);
        if lookups == 0 {
            0.0
        } else {
            hits as f64 * 100.0 / lookups as f64
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        push_gauge(
            &mut output,
            "stockroom_uptime_seconds",
            "Time since server start in seconds",
            self.uptime_seconds(),
        );
        push_counter(
            &mut output,
            "stockroom_requests_total",
            "Total number of requests seen by the admission gate",
            &self.total_requests,
        );
        push_counter(
            &mut output,
            "stockroom_requests_admitted",
            "Requests admitted by the global token bucket",
            &self.requests_admitted,
        );
        push_counter(
            &mut output,
            "stockroom_requests_rate_limited",
            "Requests rejected with 429 by the global token bucket",
            &self.requests_rate_limited,
        );

        // Latency distribution
        let under_1ms = self.latency_under_1ms.load(Ordering::Relaxed);
        let under_10ms = under_1ms + self.latency_under_10ms.load(Ordering::Relaxed);
        let under_100ms = under_10ms + self.latency_under_100ms.load(Ordering::Relaxed);
        let under_1s = under_100ms + self.latency_under_1s.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);

        output.push_str("# HELP stockroom_request_duration Admitted request latency distribution\n");
        output.push_str("# TYPE stockroom_request_duration histogram\n");
        output.push_str(&format!(
            "stockroom_request_duration_bucket{{le=\"0.001\"}} {under_1ms}\n"
        ));
        output.push_str(&format!(
            "stockroom_request_duration_bucket{{le=\"0.01\"}} {under_10ms}\n"
        ));
        output.push_str(&format!(
            "stockroom_request_duration_bucket{{le=\"0.1\"}} {under_100ms}\n"
        ));
        output.push_str(&format!(
            "stockroom_request_duration_bucket{{le=\"1\"}} {under_1s}\n"
        ));
        output.push_str(&format!(
            "stockroom_request_duration_bucket{{le=\"+Inf\"}} {count}\n"
        ));
        let latency_sum_seconds =
            self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        output.push_str(&format!(
            "stockroom_request_duration_sum {latency_sum_seconds:.6}\n"
        ));
        output.push_str(&format!("stockroom_request_duration_count {count}\n\n"));

        // Cache-aside
        push_counter(
            &mut output,
            "stockroom_cache_hits",
            "Item reads served from the cache",
            &self.cache_hits,
        );
        push_counter(
            &mut output,
            "stockroom_cache_misses",
            "Item reads that fell through to the store",
            &self.cache_misses,
        );
        push_counter(
            &mut output,
            "stockroom_cache_errors",
            "Cache operations that failed and were absorbed",
            &self.cache_errors,
        );
        output.push_str("# HELP stockroom_cache_hit_rate_percent Cache hit rate\n");
        output.push_str("# TYPE stockroom_cache_hit_rate_percent gauge\n");
        output.push_str(&format!(
            "stockroom_cache_hit_rate_percent {:.2}\n\n",
            self.cache_hit_rate_percent()
        ));

        push_counter(
            &mut output,
            "stockroom_store_errors",
            "Durable store failures reported to clients",
            &self.store_errors,
        );

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheObserver for Metrics {
    fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }
}

fn push_counter(output: &mut String, name: &str, help: &str, value: &AtomicU64) {
    output.push_str(&format!("# HELP {name} {help}\n"));
    output.push_str(&format!("# TYPE {name} counter\n"));
    output.push_str(&format!("{name} {}\n\n", value.load(Ordering::Relaxed)));
}

fn push_gauge(output: &mut String, name: &str, help: &str, value: u64) {
    output.push_str(&format!("# HELP {name} {help}\n"));
    output.push_str(&format!("# TYPE {name} gauge\n"));
    output.push_str(&format!("{name} {value}\n\n"));
}
