//! Installation listing and repository browsing endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::InstallationResponse;
use crate::github::Repository;
use crate::installations::store;
use crate::AppState;

use super::auth::CurrentUser;
use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ListInstallationsResponse {
    pub installations: Vec<InstallationResponse>,
}

#[derive(Debug, Serialize)]
pub struct ListReposResponse {
    pub repositories: Vec<Repository>,
    pub total: usize,
}

/// GET /api/github/installations
pub async fn list_installations(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ListInstallationsResponse>, ApiError> {
    let installations = store::list_for_user(&state.db, &user.id)
        .await?
        .into_iter()
        .map(InstallationResponse::from)
        .collect();

    Ok(Json(ListInstallationsResponse { installations }))
}

/// GET /api/github/installations/:installation_id/repos
///
/// Ownership is checked before any upstream call: only the claimed owner of
/// an ACTIVE installation can list its repositories.
pub async fn list_installation_repos(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(installation_id): Path<i64>,
) -> Result<Json<ListReposResponse>, ApiError> {
    let installation = store::get_by_installation_id(&state.db, installation_id)
        .await?
        .filter(|inst| inst.user_id.as_deref() == Some(user.id.as_str()))
        .filter(|inst| inst.status == "ACTIVE")
        .ok_or_else(|| ApiError::not_found("Installation not found"))?;

    let repositories = state
        .broker
        .list_installation_repos(installation.installation_id)
        .await?;
    let total = repositories.len();

    Ok(Json(ListReposResponse {
        repositories,
        total,
    }))
}
