//! Metrics collection and exposition.
//!
//! # Metrics
//! - `token_proxy_requests_total` (counter): requests by outcome
//!   (`authenticated`, `passthrough`, `rejected`)
//! - `token_proxy_exchange_total` (counter): broker exchanges by provider, result
//! - `token_proxy_exchange_duration_seconds` (histogram): broker latency
//! - `token_proxy_upstream_responses_total` (counter): destination responses by status
//! - `token_proxy_provider_config_refresh_total` (counter): key refreshes by result
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(outcome: &'static str) {
    ::metrics::counter!("token_proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_exchange(provider: &'static str, success: bool, started: Instant) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!(
        "token_proxy_exchange_total",
        "provider" => provider,
        "result" => result
    )
    .increment(1);
    ::metrics::histogram!("token_proxy_exchange_duration_seconds", "provider" => provider)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_upstream(status: u16) {
    ::metrics::counter!("token_proxy_upstream_responses_total", "status" => status.to_string())
        .increment(1);
}

pub fn record_provider_refresh(success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("token_proxy_provider_config_refresh_total", "result" => result).increment(1);
}
