//! # Prometheus Metrics
//!
//! Owns the Prometheus registry and the HTTP duration histogram scraped by
//! the monitoring stack. The dashboard panels (request rate, P50/P95/P99
//! latency, cumulative count, status-code breakdown) are all derived from a
//! single histogram family:
//!
//! - `http_server_duration_milliseconds_bucket`
//! - `http_server_duration_milliseconds_count`
//! - `http_server_duration_milliseconds_sum`
//!
//! Every series carries the constant label `service="asr-api"` plus variable
//! labels `method`, `route` and `status_code`. The `route` label uses the
//! matched path pattern, not the raw URI, so per-route cardinality stays
//! bounded.

use actix_web::{web, HttpResponse};
use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};

use crate::state::AppState;

/// Service name stamped on every exported series.
pub const SERVICE_NAME: &str = "asr-api";

/// Duration buckets in milliseconds. Transcription latency spans four orders
/// of magnitude (a one-second clip on GPU vs. a podcast on CPU), so the
/// buckets stretch to one minute.
const DURATION_BUCKETS_MS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
];

/// Prometheus registry plus the histogram instruments recorded by the
/// metrics middleware.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Create the registry and register the duration histogram.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let opts = HistogramOpts::new(
            "http_server_duration_milliseconds",
            "HTTP request duration in milliseconds",
        )
        .const_label("service", SERVICE_NAME)
        .buckets(DURATION_BUCKETS_MS.to_vec());

        let request_duration = HistogramVec::new(opts, &["method", "route", "status_code"])?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            request_duration,
        })
    }

    /// Record one completed request.
    pub fn observe_request(&self, method: &str, route: &str, status_code: u16, duration_ms: f64) {
        self.request_duration
            .with_label_values(&[method, route, &status_code.to_string()])
            .observe(duration_ms);
    }

    /// Render all registered metrics in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// `GET /metrics` — Prometheus scrape endpoint.
pub async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    match state.http_metrics.export() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(body),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_registration_and_export() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe_request("POST", "/asr", 200, 1234.0);
        metrics.observe_request("POST", "/asr", 500, 10.0);

        let exported = metrics.export().unwrap();
        assert!(exported.contains("http_server_duration_milliseconds_bucket"));
        assert!(exported.contains("http_server_duration_milliseconds_count"));
        assert!(exported.contains("service=\"asr-api\""));
        assert!(exported.contains("route=\"/asr\""));
        assert!(exported.contains("status_code=\"500\""));
    }

    #[test]
    fn test_observe_is_idempotent_on_labels() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe_request("GET", "/health", 200, 1.0);
        metrics.observe_request("GET", "/health", 200, 2.0);

        let exported = metrics.export().unwrap();
        // Two observations accumulate into one series.
        assert!(exported.contains(
            "http_server_duration_milliseconds_count{method=\"GET\",route=\"/health\",service=\"asr-api\",status_code=\"200\"} 2"
        ));
    }
}
