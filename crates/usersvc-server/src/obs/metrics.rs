//! Metrics registry for the user service.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic ordering.
//! Histogram buckets are fixed in microseconds and rendered in seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, key: &LabelKey) -> String {
    if key.is_empty() {
        name.to_string()
    } else {
        format!("{}{{{}}}", name, label_str(key))
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for a label set (0 if never incremented).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(name, r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    /// Overwrite the value.
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(name, r.key()), val);
        }
    }
}

// Prometheus default buckets, held in microseconds:
// 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MICROS: [u64; 11] = [
    5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000, 2_500_000, 5_000_000,
    10_000_000,
];

fn micros_as_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

impl Default for AtomicHistogram {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);

        // Cumulative: every bucket at or above the value.
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of observations for a label set.
    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let key = r.key();
            let hist = r.value();

            let labels = label_str(key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(
                    out,
                    "{}_bucket{{{}le=\"{}\"}} {}",
                    name,
                    prefix,
                    micros_as_secs(le),
                    count
                );
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = micros_as_secs(hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), key), sum);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), key), count);
        }
    }
}

/// Process-wide service metrics. Built once at startup and shared by `Arc`.
pub struct ServiceMetrics {
    pub http_requests: CounterVec,
    pub http_request_duration: HistogramVec,
    pub http_requests_in_flight: GaugeVec,
    pub users_total: GaugeVec,
    pub user_lookups: CounterVec,
    pub errors: CounterVec,
    pub rate_limit_hits: CounterVec,
    pub panic_recoveries: CounterVec,
    pub last_request_time: GaugeVec,
    started: Instant,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            http_requests: CounterVec::default(),
            http_request_duration: HistogramVec::default(),
            http_requests_in_flight: GaugeVec::default(),
            users_total: GaugeVec::default(),
            user_lookups: CounterVec::default(),
            errors: CounterVec::default(),
            rate_limit_hits: CounterVec::default(),
            panic_recoveries: CounterVec::default(),
            last_request_time: GaugeVec::default(),
            started: Instant::now(),
        }
    }

    /// Record one completed request.
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.http_requests.inc(&[
            ("method", method),
            ("endpoint", endpoint),
            ("status_code", &status),
        ]);
        self.http_request_duration
            .observe(&[("method", method), ("endpoint", endpoint)], elapsed);
    }

    /// Count a request as in flight until the returned guard is dropped.
    pub fn track_in_flight(self: &Arc<Self>) -> InFlightGuard {
        self.http_requests_in_flight.inc(&[]);
        InFlightGuard {
            metrics: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> i64 {
        self.http_requests_in_flight.get(&[])
    }

    pub fn set_users_total(&self, count: usize) {
        self.users_total
            .set(&[], i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn record_user_lookup(&self, result: &str) {
        self.user_lookups.inc(&[("result", result)]);
    }

    pub fn record_error(&self, kind: &str, endpoint: &str) {
        self.errors.inc(&[("type", kind), ("endpoint", endpoint)]);
    }

    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.inc(&[]);
    }

    pub fn record_panic_recovery(&self) {
        self.panic_recoveries.inc(&[]);
    }

    pub fn panic_recovery_count(&self) -> u64 {
        self.panic_recoveries.get(&[])
    }

    pub fn update_last_request_time(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_request_time
            .set(&[], i64::try_from(now).unwrap_or(i64::MAX));
    }

    /// Render all registered metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.http_requests.render(
            "http_requests_total",
            "Total number of HTTP requests processed",
            &mut out,
        );
        self.http_request_duration.render(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &mut out,
        );
        self.http_requests_in_flight.render(
            "http_requests_in_flight",
            "Number of HTTP requests currently being processed",
            &mut out,
        );
        self.users_total
            .render("users_total", "Total number of users in the system", &mut out);
        self.user_lookups.render(
            "user_lookups_total",
            "Total number of user lookup operations",
            &mut out,
        );
        self.errors
            .render("errors_total", "Total number of errors by type", &mut out);
        self.rate_limit_hits.render(
            "rate_limit_hits_total",
            "Total number of rate limit violations",
            &mut out,
        );
        self.panic_recoveries.render(
            "panic_recoveries_total",
            "Total number of panic recoveries",
            &mut out,
        );
        self.last_request_time.render(
            "last_request_time_seconds",
            "Unix timestamp of the last request",
            &mut out,
        );

        let _ = writeln!(out, "# HELP uptime_seconds_total Total uptime in seconds");
        let _ = writeln!(
            out,
            "# TYPE uptime_seconds_total counter\nuptime_seconds_total {}",
            self.started.elapsed().as_secs()
        );
        out
    }
}

/// Decrements the in-flight gauge on drop, including during unwinding.
pub struct InFlightGuard {
    metrics: Arc<ServiceMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.http_requests_in_flight.dec(&[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::default();
        h.observe(&[("method", "GET")], Duration::from_millis(20));
        let mut out = String::new();
        h.render("d", "help", &mut out);

        assert!(out.contains("d_bucket{method=\"GET\",le=\"0.01\"} 0"));
        assert!(out.contains("d_bucket{method=\"GET\",le=\"0.025\"} 1"));
        assert!(out.contains("d_bucket{method=\"GET\",le=\"10\"} 1"));
        assert!(out.contains("d_bucket{method=\"GET\",le=\"+Inf\"} 1"));
        assert!(out.contains("d_count{method=\"GET\"} 1"));
    }

    #[test]
    fn in_flight_guard_releases() {
        let m = Arc::new(ServiceMetrics::new());
        {
            let _g = m.track_in_flight();
            assert_eq!(m.in_flight(), 1);
        }
        assert_eq!(m.in_flight(), 0);
    }

    #[test]
    fn label_order_does_not_matter() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
    }
}
