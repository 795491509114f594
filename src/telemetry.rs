//! In-process HTTP request metrics with Prometheus text exposition.
//!
//! Every request is labelled by method, route template and status code,
//! e.g. `GET /api/appointments/:id 404`. Callers pass templates, not raw
//! paths; requests that matched no route share [`UNMATCHED_ROUTE`].

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Histogram bucket upper bounds, in seconds.
pub const DURATION_BUCKETS: [f64; 9] = [0.1, 0.3, 0.5, 0.7, 1.0, 3.0, 5.0, 7.0, 10.0];

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Content type of the exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SeriesKey {
    method: String,
    route: String,
    code: u16,
}

#[derive(Debug, Clone, Default)]
struct Series {
    count: u64,
    sum_seconds: f64,
    /// Non-cumulative per-bucket counts; cumulated at render time.
    buckets: [u64; DURATION_BUCKETS.len()],
}

#[derive(Debug, Default)]
pub struct HttpMetrics {
    series: Mutex<BTreeMap<SeriesKey, Series>>,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, method: &str, route: &str, code: u16, elapsed: Duration) {
        let key = SeriesKey {
            method: method.to_string(),
            route: route.to_string(),
            code,
        };
        let seconds = elapsed.as_secs_f64();

        let Ok(mut series) = self.series.lock() else {
            tracing::warn!("metrics lock poisoned, dropping observation");
            return;
        };
        let entry = series.entry(key).or_default();
        entry.count += 1;
        entry.sum_seconds += seconds;
        if let Some(idx) = DURATION_BUCKETS.iter().position(|bound| seconds <= *bound) {
            if let Some(bucket) = entry.buckets.get_mut(idx) {
                *bucket += 1;
            }
        }
    }

    /// Render every series in the Prometheus text format.
    pub fn render(&self, uptime: Duration) -> String {
        let snapshot = match self.series.lock() {
            Ok(series) => series.clone(),
            Err(_) => BTreeMap::new(),
        };

        let mut body = String::new();
        body.push_str("# HELP http_request_duration_seconds Duration of HTTP requests in seconds\n");
        body.push_str("# TYPE http_request_duration_seconds histogram\n");
        for (key, series) in &snapshot {
            let labels = format!(
                "method=\"{}\",route=\"{}\",code=\"{}\"",
                key.method, key.route, key.code
            );
            let mut cumulative = 0_u64;
            for (bound, count) in DURATION_BUCKETS.iter().zip(series.buckets.iter()) {
                cumulative += count;
                body.push_str(&format!(
                    "http_request_duration_seconds_bucket{{{labels},le=\"{bound}\"}} {cumulative}\n"
                ));
            }
            body.push_str(&format!(
                "http_request_duration_seconds_bucket{{{labels},le=\"+Inf\"}} {}\n",
                series.count
            ));
            body.push_str(&format!(
                "http_request_duration_seconds_sum{{{labels}}} {:.9}\n",
                series.sum_seconds
            ));
            body.push_str(&format!(
                "http_request_duration_seconds_count{{{labels}}} {}\n",
                series.count
            ));
        }

        body.push_str("# HELP http_request_total Total number of HTTP requests\n");
        body.push_str("# TYPE http_request_total counter\n");
        for (key, series) in &snapshot {
            body.push_str(&format!(
                "http_request_total{{method=\"{}\",route=\"{}\",code=\"{}\"}} {}\n",
                key.method, key.route, key.code, series.count
            ));
        }

        body.push_str("# HELP process_uptime_seconds Seconds since the service started\n");
        body.push_str("# TYPE process_uptime_seconds gauge\n");
        body.push_str(&format!(
            "process_uptime_seconds {:.3}\n",
            uptime.as_secs_f64()
        ));
        body.push_str("# HELP carebook_build_info Build metadata\n");
        body.push_str("# TYPE carebook_build_info gauge\n");
        body.push_str(&format!(
            "carebook_build_info{{version=\"{}\"}} 1\n",
            crate::config::APP_VERSION
        ));
        body
    }
}
