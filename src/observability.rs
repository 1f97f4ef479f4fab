use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: confirmations that produced an assignment.
pub const CONFIRMATIONS_TOTAL: &str = "innkeep_confirmations_total";

/// Counter: confirmations that found no eligible room.
pub const CONFIRMATIONS_NOT_AVAILABLE_TOTAL: &str = "innkeep_confirmations_not_available_total";

/// Counter: bookings cancelled.
pub const CANCELLATIONS_TOTAL: &str = "innkeep_cancellations_total";

/// Counter: transitions rejected by the booking state machine.
pub const INVALID_TRANSITIONS_TOTAL: &str = "innkeep_invalid_transitions_total";

/// Histogram: confirm latency in seconds.
pub const CONFIRM_DURATION_SECONDS: &str = "innkeep_confirm_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: WAL appends that failed or timed out and were retried.
pub const WAL_RETRIES_TOTAL: &str = "innkeep_wal_retries_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeep_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "innkeep_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if `None`.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the default fmt tracing subscriber. Embedders with their own
/// subscriber skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
