//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_orders_accepted_total` (counter): orders admitted by the gateway
//! - `relay_orders_rejected_total` (counter): rejections by filter
//! - `relay_rpc_round_trips_total` (counter): node round trips by kind (single, batch)
//! - `relay_rpc_errors_total` (counter): failed calls by method
//! - `relay_rpc_duration_seconds` (histogram): round-trip latency by kind
//! - `relay_transactions_sent_total` (counter): broadcast transactions by method
//! - `relay_chain_healthy` (gauge): 1=node reachable, 0=unreachable
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_order_accepted() {
    counter!("relay_orders_accepted_total").increment(1);
}

pub fn record_order_rejected(filter: &'static str) {
    counter!("relay_orders_rejected_total", "filter" => filter).increment(1);
}

pub fn record_rpc_round_trip(kind: &'static str, started: Instant) {
    counter!("relay_rpc_round_trips_total", "kind" => kind).increment(1);
    histogram!("relay_rpc_duration_seconds", "kind" => kind).record(started.elapsed().as_secs_f64());
}

pub fn record_rpc_error(method: &str) {
    counter!("relay_rpc_errors_total", "method" => method.to_string()).increment(1);
}

pub fn record_transaction_sent(method: &str) {
    counter!("relay_transactions_sent_total", "method" => method.to_string()).increment(1);
}

pub fn record_chain_health(healthy: bool) {
    gauge!("relay_chain_healthy").set(if healthy { 1.0 } else { 0.0 });
}
