use anyhow::Result;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Instant;
use warp::http::StatusCode;

/// Per-endpoint request accounting. Without an installed exporter the
/// macros are no-ops, which is how tests run.
#[derive(Clone, Debug, Default)]
pub struct MetricsCollector {
    port: Option<u16>,
}

impl MetricsCollector {
    pub fn new(port: Option<u16>) -> Result<Self> {
        if let Some(port) = port {
            PrometheusBuilder::new()
                .with_http_listener(([0, 0, 0, 0], port))
                .install()?;
        }
        Ok(Self { port })
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn record_request(&self, endpoint: &'static str, status: StatusCode, start_time: Instant) {
        let status = status.as_u16().to_string();
        counter!("http_requests_total", "endpoint" => endpoint, "status" => status).increment(1);
        histogram!("http_request_duration_seconds", "endpoint" => endpoint)
            .record(start_time.elapsed().as_secs_f64());
    }

    pub fn record_upstream_error(&self, endpoint: &'static str) {
        counter!("upstream_errors_total", "endpoint" => endpoint).increment(1);
    }
}
