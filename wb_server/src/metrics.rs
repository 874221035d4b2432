//! Prometheus metrics for tournament health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener,
//! enabled with `--metrics-bind` or `METRICS_BIND`. Without an installed
//! recorder every helper here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration
//! - **Scheduler Metrics**: Sweep duration, starts, walkovers, completions
//! - **Match Metrics**: Accepted legs and forfeits
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use wb_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/matches/{id}/legs", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use word_bracket::tournament::TickReport;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Increments the total HTTP request counter with method, path, and status labels.
///
/// `path` is the route template, not the concrete URI, to keep label
/// cardinality bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Scheduler Metrics
// ============================================================================

/// Record the counters of one scheduler sweep.
pub fn record_tick(report: &TickReport, duration_ms: f64) {
    metrics::counter!("scheduler_ticks_total").increment(1);
    metrics::histogram!("scheduler_tick_duration_ms").record(duration_ms);
    metrics::gauge!("scheduler_tournaments_checked").set(report.tournaments_checked as f64);

    metrics::counter!("tournaments_started_total").increment(report.started as u64);
    metrics::counter!("tournaments_closed_without_players_total")
        .increment(report.closed_without_players as u64);
    metrics::counter!("tournaments_completed_total").increment(report.completed as u64);
    metrics::counter!("matches_walkover_total").increment(report.walkovers as u64);
    metrics::counter!("rounds_advanced_total").increment(report.rounds_advanced as u64);
    metrics::counter!("reward_payouts_total").increment(report.rewards_paid as u64);
    metrics::counter!("scheduler_failures_total").increment(report.failures as u64);
}

/// Record a sweep that failed before visiting any tournament.
pub fn tick_errors_total() {
    metrics::counter!("scheduler_tick_errors_total").increment(1);
}

// ============================================================================
// Match Metrics
// ============================================================================

/// Record an accepted leg, labelled by whether it decided the match.
pub fn legs_submitted_total(completed: bool) {
    metrics::counter!("legs_submitted_total",
        "completed" => completed.to_string()
    )
    .increment(1);
}

/// Record a forfeit.
pub fn forfeits_total() {
    metrics::counter!("forfeits_total").increment(1);
}

/// Record a completed challenge.
pub fn challenges_completed_total() {
    metrics::counter!("challenges_completed_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 0.4);
        record_tick(
            &TickReport {
                tournaments_checked: 3,
                walkovers: 2,
                ..TickReport::default()
            },
            12.0,
        );
        tick_errors_total();
        legs_submitted_total(true);
        forfeits_total();
        challenges_completed_total();
    }
}
