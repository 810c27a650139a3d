pub mod auth;
mod callback;
pub mod error;
mod installations;
pub mod metrics;
mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new().route("/login", post(auth::login));

    // API routes; handlers authenticate via the CurrentUser extractor. The
    // callback is listed here but does its own auth so it can redirect to
    // /login instead of returning 401 to a browser.
    let api_routes = Router::new()
        .route("/github/installations", get(installations::list_installations))
        .route(
            "/github/installations/:installation_id/repos",
            get(installations::list_installation_repos),
        )
        .route("/github/callback", get(callback::github_callback));

    let webhook_routes = Router::new().route("/github", post(webhooks::github_webhook));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
