//! GitHub webhook receiver.
//!
//! Signature verification runs over the raw body bytes before any parsing.
//! GitHub redelivers on non-2xx, so only genuinely retryable failures
//! (database errors) return 5xx; everything else is acknowledged or
//! rejected terminally.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::github::verify_webhook_signature;
use crate::installations::lifecycle::{self, InstallationEvent};
use crate::AppState;

use super::metrics::{WEBHOOK_EVENTS_TOTAL, WEBHOOK_REJECTED_TOTAL};

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const EVENT_HEADER: &str = "X-GitHub-Event";

/// POST /webhooks/github
pub async fn github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_webhook_signature(
        state.config.github.webhook_secret.as_deref(),
        &body,
        signature,
    ) {
        tracing::warn!("GitHub webhook signature verification failed");
        metrics::counter!(WEBHOOK_REJECTED_TOTAL).increment(1);
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Only installation lifecycle events are handled; everything else is
    // acknowledged so GitHub does not redeliver it.
    if event_type != "installation" {
        tracing::debug!(event_type, "Ignoring non-installation webhook event");
        return Ok(Json(json!({ "ok": true })));
    }

    let event: InstallationEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse installation webhook payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    metrics::counter!(WEBHOOK_EVENTS_TOTAL).increment(1);

    lifecycle::apply_webhook_event(&state.db, &state.broker, event)
        .await
        .map_err(|e| {
            tracing::error!("Failed to apply installation webhook event: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(json!({ "ok": true })))
}
