//! GitHub App post-install callback.
//!
//! GitHub redirects the installing user's browser here after an install or
//! an update from the app settings page. The handler always responds with a
//! redirect; failures land the user back on the projects page with a
//! machine-readable error code in the query string.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::installations::lifecycle;
use crate::AppState;

use super::auth::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub installation_id: Option<String>,
    #[allow(dead_code)]
    pub setup_action: Option<String>,
}

fn error_redirect(code: &str) -> Redirect {
    Redirect::to(&format!("/projects?error={}", code))
}

/// GET /api/github/callback
pub async fn github_callback(
    State(state): State<Arc<AppState>>,
    user: Option<CurrentUser>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let Some(CurrentUser(user)) = user else {
        return Redirect::to("/login");
    };

    let installation_id: i64 = match params.installation_id.as_deref().map(str::parse) {
        Some(Ok(id)) => id,
        _ => {
            tracing::warn!("GitHub callback missing or invalid installation_id");
            return error_redirect("missing_installation_id");
        }
    };

    // Fetch live details from GitHub rather than trusting the query string;
    // the installation_id is the only input taken from the browser.
    let details = match state.broker.installation_details(installation_id).await {
        Ok(details) => details,
        Err(e) => {
            tracing::error!(installation_id, "Failed to fetch installation details: {}", e);
            return error_redirect("github_callback_failed");
        }
    };

    match lifecycle::claim_installation(&state.db, &user.id, &details).await {
        Ok(_) => Redirect::to("/projects?github=connected"),
        Err(e) => {
            tracing::warn!(installation_id, user_id = %user.id, "Installation claim failed: {}", e);
            error_redirect(e.redirect_code())
        }
    }
}
