// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};

lazy_static! {
    // --- Server-wide Gauges ---
    /// The number of client connections currently open.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("anchorage_connected_clients", "Number of currently connected clients.").unwrap();
    /// The number of accounts currently bound to a live session.
    pub static ref BOUND_ACCOUNTS: Gauge =
        register_gauge!("anchorage_bound_accounts", "Number of accounts bound to a live session.").unwrap();
    pub static ref MAINTENANCE_MODE: Gauge =
        register_gauge!("anchorage_maintenance_mode", "Maintenance mode (1 for enabled, 0 for disabled).").unwrap();


    // --- Server-wide Counters ---
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("anchorage_connections_received_total", "Total number of connections received.").unwrap();
    /// Connections dropped at accept time, labeled by why.
    pub static ref CONNECTIONS_REJECTED_TOTAL: CounterVec =
        register_counter_vec!("anchorage_connections_rejected_total", "Total number of connections rejected at accept time.", &["reason"]).unwrap();
    /// The total number of frames handed to a handler.
    pub static ref PACKETS_DISPATCHED_TOTAL: Counter =
        register_counter!("anchorage_packets_dispatched_total", "Total number of packets dispatched to handlers.").unwrap();
    pub static ref UNKNOWN_PACKETS_TOTAL: Counter =
        register_counter!("anchorage_unknown_packets_total", "Total number of packets with no registered handler.").unwrap();
    pub static ref HANDLER_ERRORS_TOTAL: Counter =
        register_counter!("anchorage_handler_errors_total", "Total number of handler invocations that returned an error.").unwrap();
    pub static ref FRAMING_ERRORS_TOTAL: Counter =
        register_counter!("anchorage_framing_errors_total", "Total number of connections closed for malformed framing.").unwrap();
    /// Sessions closed by a login elsewhere or an explicit kick.
    pub static ref SESSIONS_KICKED_TOTAL: Counter =
        register_counter!("anchorage_sessions_kicked_total", "Total number of sessions kicked.").unwrap();


    // --- Histograms ---
    /// A histogram of handler execution latencies.
    pub static ref HANDLER_LATENCY_SECONDS: Histogram =
        register_histogram!("anchorage_handler_latency_seconds", "Latency of packet handling in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
