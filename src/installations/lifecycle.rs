//! Lifecycle reconciliation for installation events.
//!
//! Webhook deliveries and callback claims arrive independently and in any
//! order; both funnel through here. Webhook events drive all status
//! transitions; the callback path only creates or claims rows.

use serde::Deserialize;
use thiserror::Error;

use crate::db::{DbPool, Installation, InstallationStatus, UpsertInstallation};
use crate::github::{CredentialBroker, GitHubError, InstallationDetails};

use super::store::{self, StatusUpdate};

/// Provider key under which GitHub identities are linked.
const PROVIDER_GITHUB: &str = "github";

#[derive(Debug, Deserialize)]
pub struct AccountPayload {
    pub id: i64,
    pub login: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationPayload {
    pub id: i64,
    pub account: AccountPayload,
    pub repository_selection: Option<String>,
    pub permissions: Option<serde_json::Value>,
    pub events: Option<Vec<String>>,
}

/// Installation webhook payloads, as a closed set keyed by `action`.
/// Anything GitHub sends that is not modeled here lands in `Other` and is
/// intentionally ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InstallationEvent {
    Created { installation: InstallationPayload },
    Deleted { installation: InstallationPayload },
    Suspend { installation: InstallationPayload },
    Unsuspend { installation: InstallationPayload },
    #[serde(other)]
    Other,
}

impl InstallationPayload {
    fn to_upsert(&self) -> UpsertInstallation {
        UpsertInstallation {
            installation_id: self.id,
            user_id: None,
            account_id: self.account.id,
            account_login: self.account.login.clone(),
            account_type: self.account.account_type.clone(),
            account_avatar_url: self.account.avatar_url.clone(),
            repository_selection: self.repository_selection.clone(),
            permissions: self.permissions.clone(),
            events: self.events.clone(),
        }
    }
}

/// Apply one webhook event onto the store. Idempotent: GitHub redelivers on
/// timeout, and replays must not produce side effects beyond the first
/// application.
pub async fn apply_webhook_event(
    pool: &DbPool,
    broker: &CredentialBroker,
    event: InstallationEvent,
) -> Result<(), sqlx::Error> {
    match event {
        InstallationEvent::Created { installation } => {
            let inserted = store::insert_provisional(pool, &installation.to_upsert()).await?;
            if inserted {
                tracing::info!(
                    installation_id = installation.id,
                    account = %installation.account.login,
                    "Installation created via webhook (unowned until claimed)"
                );
            } else {
                tracing::info!(
                    installation_id = installation.id,
                    "Installation already exists, ignoring created event"
                );
            }
        }
        InstallationEvent::Suspend { installation } => {
            let outcome =
                store::update_status(pool, installation.id, InstallationStatus::Suspended).await?;
            broker.invalidate_installation_token(installation.id);
            if outcome == StatusUpdate::Applied {
                tracing::info!(installation_id = installation.id, "Installation suspended");
            }
        }
        InstallationEvent::Unsuspend { installation } => {
            let outcome =
                store::update_status(pool, installation.id, InstallationStatus::Active).await?;
            if outcome == StatusUpdate::Applied {
                tracing::info!(installation_id = installation.id, "Installation unsuspended");
            }
        }
        InstallationEvent::Deleted { installation } => {
            let outcome =
                store::update_status(pool, installation.id, InstallationStatus::Deleted).await?;
            broker.invalidate_installation_token(installation.id);
            if outcome == StatusUpdate::Applied {
                tracing::info!(installation_id = installation.id, "Installation deleted");
            }
        }
        InstallationEvent::Other => {
            tracing::debug!("Ignoring unhandled installation action");
        }
    }
    Ok(())
}

/// Why a callback claim was refused. `redirect_code` is the machine-readable
/// code carried on the error redirect.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("organization installations are not supported")]
    OrgNotSupported,
    #[error("no GitHub identity linked for this user")]
    NotLinked,
    #[error("installation belongs to a different GitHub account")]
    OwnerMismatch,
    #[error(transparent)]
    Upstream(#[from] GitHubError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ClaimError {
    pub fn redirect_code(&self) -> &'static str {
        match self {
            Self::OrgNotSupported => "org_installation_not_supported",
            Self::NotLinked => "github_not_linked",
            Self::OwnerMismatch => "installation_owner_mismatch",
            Self::Upstream(_) | Self::Database(_) => "github_callback_failed",
        }
    }
}

/// Bind an installation to the calling user.
///
/// Only User-type accounts can be claimed, and only by the local user whose
/// linked GitHub identity matches the installation's account id - otherwise
/// anyone could hijack a grant by guessing its installation id. Every
/// refusal leaves the store untouched.
pub async fn claim_installation(
    pool: &DbPool,
    user_id: &str,
    details: &InstallationDetails,
) -> Result<Installation, ClaimError> {
    if details.account.account_type != "User" {
        tracing::warn!(
            installation_id = details.id,
            account = %details.account.login,
            "Organization installation not supported"
        );
        return Err(ClaimError::OrgNotSupported);
    }

    let identity = store::find_identity(pool, user_id, PROVIDER_GITHUB)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id, "User has no GitHub identity linked");
            ClaimError::NotLinked
        })?;

    // An unparseable provider id can never match
    let linked_id: i64 = identity.provider_user_id.parse().unwrap_or(-1);
    if details.account.id != linked_id {
        tracing::warn!(
            user_id,
            linked_github_id = linked_id,
            installation_account_id = details.account.id,
            account = %details.account.login,
            "Installation owner mismatch"
        );
        return Err(ClaimError::OwnerMismatch);
    }

    let installation = store::upsert_installation(
        pool,
        &UpsertInstallation {
            installation_id: details.id,
            user_id: Some(user_id.to_string()),
            account_id: details.account.id,
            account_login: details.account.login.clone(),
            account_type: details.account.account_type.clone(),
            account_avatar_url: details.account.avatar_url.clone(),
            repository_selection: details.repository_selection.clone(),
            permissions: Some(details.permissions.clone()),
            events: Some(details.events.clone()),
        },
    )
    .await?;

    tracing::info!(
        installation_id = details.id,
        account = %details.account.login,
        "GitHub App installation claimed"
    );

    Ok(installation)
}
