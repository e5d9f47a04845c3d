//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "cartomante_requests_total",
        "Total number of chat and speech requests processed"
    );
    metrics::describe_histogram!(
        "cartomante_request_duration_seconds",
        "Upstream request duration in seconds"
    );
    metrics::describe_counter!(
        "cartomante_usage_seconds_total",
        "Billable conversation seconds accrued"
    );
    metrics::describe_counter!(
        "cartomante_usage_flushes_total",
        "Usage flushes to the profile store by trigger and result"
    );
    metrics::describe_counter!(
        "cartomante_webhook_events_total",
        "Stripe webhook events by type and result"
    );
    metrics::describe_counter!(
        "cartomante_quota_rejections_total",
        "Requests rejected by the trial quota gate"
    );
    metrics::describe_counter!("cartomante_sessions_started_total", "Sessions started");
    metrics::describe_counter!(
        "cartomante_sessions_ended_total",
        "Sessions ended by reason"
    );
    metrics::describe_gauge!("cartomante_active_sessions", "Number of active sessions");
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record an upstream request
pub fn record_request(route: &'static str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "cartomante_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("cartomante_request_duration_seconds", "route" => route)
        .record(duration_secs);
}
