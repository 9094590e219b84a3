//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by pattern, status
//! - `gateway_request_duration_seconds` (histogram): latency by pattern
//! - `gateway_rejections_total` (counter): pipeline rejections by kind
//! - `gateway_cache_events_total` (counter): hit / miss / unavailable / store_failed
//! - `gateway_clients_evicted_total` (counter): janitor evictions
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations behind the `metrics` macros)
//! - Exposition via the Prometheus exporter's own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint started"),
        Err(err) => tracing::error!(error = %err, "failed to install metrics exporter"),
    }
}

pub fn record_request(pattern: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "pattern" => pattern.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "pattern" => pattern.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rejected(kind: &'static str) {
    counter!("gateway_rejections_total", "kind" => kind).increment(1);
}

pub fn record_cache_event(event: &'static str) {
    counter!("gateway_cache_events_total", "event" => event).increment(1);
}

pub fn record_clients_evicted(count: usize) {
    counter!("gateway_clients_evicted_total").increment(count as u64);
}
