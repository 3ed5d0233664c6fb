//! RPC metrics
//!
//! Prometheus-compatible metrics including:
//! - Request latency histograms per RPC method
//! - Request counters by method and outcome
//! - Streaming counters (records emitted, streams in flight)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Histogram bucket boundaries for latency measurements (in milliseconds)
const LATENCY_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// A simple histogram implementation for latency tracking
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<f64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_buckets(&LATENCY_BUCKETS)
    }

    pub fn with_buckets(boundaries: &[f64]) -> Self {
        Self {
            buckets: (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect(),
            boundaries: boundaries.to_vec(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value (milliseconds)
    pub fn observe(&self, value: f64) {
        let idx = self
            .boundaries
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.boundaries.len());

        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative bucket counts, ending with +Inf
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        let mut result = Vec::with_capacity(self.buckets.len());
        for (i, bucket) in self.buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            let le = self.boundaries.get(i).copied().unwrap_or(f64::INFINITY);
            result.push((le, cumulative));
        }
        result
    }

    pub fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Per-method metrics
#[derive(Debug, Default)]
pub struct MethodMetrics {
    pub requests_total: Counter,
    pub requests_error: Counter,
    pub latency: Histogram,
}

/// Global metrics registry
#[derive(Debug)]
pub struct MetricsRegistry {
    methods: Mutex<BTreeMap<String, Arc<MethodMetrics>>>,

    pub total_requests: Counter,
    pub total_errors: Counter,
    pub records_streamed: Counter,
    pub active_streams: Gauge,

    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            methods: Mutex::new(BTreeMap::new()),
            total_requests: Counter::new(),
            total_errors: Counter::new(),
            records_streamed: Counter::new(),
            active_streams: Gauge::new(),
            start_time: Instant::now(),
        }
    }

    /// Get or create metrics for a method
    pub fn method(&self, name: &str) -> Arc<MethodMetrics> {
        self.methods
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    pub fn record_request(&self, method: &str, duration: Duration, success: bool) {
        let metrics = self.method(method);
        metrics.requests_total.inc();
        metrics.latency.observe(duration.as_secs_f64() * 1000.0);
        self.total_requests.inc();

        if !success {
            metrics.requests_error.inc();
            self.total_errors.inc();
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-compatible metrics output
    pub fn to_prometheus(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();

        let scalars = [
            ("blogd_requests_total", "counter", "Total number of RPCs", self.total_requests.get()),
            ("blogd_errors_total", "counter", "Total number of failed RPCs", self.total_errors.get()),
            ("blogd_records_streamed_total", "counter", "Records sent on ListBlog streams", self.records_streamed.get()),
            ("blogd_active_streams", "gauge", "ListBlog streams in flight", self.active_streams.get()),
            ("blogd_uptime_seconds", "gauge", "Server uptime in seconds", self.uptime_seconds()),
        ];
        for (name, kind, help, value) in scalars {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} {}", name, kind);
            let _ = writeln!(out, "{} {}", name, value);
        }

        let methods = self
            .methods
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        out.push_str("# HELP blogd_method_requests_total Requests per RPC method\n");
        out.push_str("# TYPE blogd_method_requests_total counter\n");
        for (method, m) in methods.iter() {
            let _ = writeln!(
                out,
                "blogd_method_requests_total{{method=\"{}\"}} {}",
                method,
                m.requests_total.get()
            );
        }

        out.push_str("# HELP blogd_method_errors_total Errors per RPC method\n");
        out.push_str("# TYPE blogd_method_errors_total counter\n");
        for (method, m) in methods.iter() {
            let _ = writeln!(
                out,
                "blogd_method_errors_total{{method=\"{}\"}} {}",
                method,
                m.requests_error.get()
            );
        }

        out.push_str("# HELP blogd_request_duration_ms RPC duration in milliseconds\n");
        out.push_str("# TYPE blogd_request_duration_ms histogram\n");
        for (method, m) in methods.iter() {
            for (le, count) in m.latency.get_buckets() {
                let le = if le.is_infinite() {
                    "+Inf".to_string()
                } else {
                    le.to_string()
                };
                let _ = writeln!(
                    out,
                    "blogd_request_duration_ms_bucket{{method=\"{}\",le=\"{}\"}} {}",
                    method, le, count
                );
            }
            let _ = writeln!(
                out,
                "blogd_request_duration_ms_sum{{method=\"{}\"}} {}",
                method,
                m.latency.sum()
            );
            let _ = writeln!(
                out,
                "blogd_request_duration_ms_count{{method=\"{}\"}} {}",
                method,
                m.latency.count()
            );
        }

        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global metrics instance
pub static METRICS: once_cell::sync::Lazy<MetricsRegistry> =
    once_cell::sync::Lazy::new(MetricsRegistry::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        let hist = Histogram::new();
        hist.observe(5.0);
        hist.observe(50.0);
        hist.observe(50_000.0);

        assert_eq!(hist.count(), 3);
        let buckets = hist.get_buckets();
        assert_eq!(buckets.len(), LATENCY_BUCKETS.len() + 1);
        assert_eq!(buckets[1], (5.0, 1));
        assert_eq!(buckets.last().unwrap().1, 3);
        assert!(buckets.last().unwrap().0.is_infinite());
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new();
        gauge.inc();
        gauge.inc();
        gauge.dec();
        assert_eq!(gauge.get(), 1);
    }

    #[test]
    fn test_registry() {
        let registry = MetricsRegistry::new();
        registry.record_request("ReadBlog", Duration::from_millis(3), true);
        registry.record_request("ReadBlog", Duration::from_millis(30), false);

        assert_eq!(registry.total_requests.get(), 2);
        assert_eq!(registry.total_errors.get(), 1);

        let read = registry.method("ReadBlog");
        assert_eq!(read.requests_total.get(), 2);
        assert_eq!(read.requests_error.get(), 1);

        let text = registry.to_prometheus();
        assert!(text.contains("blogd_requests_total 2"));
        assert!(text.contains("blogd_method_errors_total{method=\"ReadBlog\"} 1"));
        assert!(text.contains("blogd_request_duration_ms_bucket{method=\"ReadBlog\",le=\"+Inf\"} 2"));
    }
}
