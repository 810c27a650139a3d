//! Prometheus metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

use crate::AppState;

pub const TOKENS_MINTED_TOTAL: &str = "grantr_installation_tokens_minted_total";
pub const WEBHOOK_EVENTS_TOTAL: &str = "grantr_webhook_events_total";
pub const WEBHOOK_REJECTED_TOTAL: &str = "grantr_webhook_rejected_total";

/// Install the Prometheus recorder. Called once during startup.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        TOKENS_MINTED_TOTAL,
        "Installation access tokens minted against the GitHub API"
    );
    describe_counter!(
        WEBHOOK_EVENTS_TOTAL,
        "Installation webhook events accepted and applied"
    );
    describe_counter!(
        WEBHOOK_REJECTED_TOTAL,
        "Webhook deliveries rejected for a bad or missing signature"
    );

    Ok(handle)
}

/// GET /metrics - Prometheus text format
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}
