//! GitHub App installation models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of an installation. `Deleted` is terminal: no status
/// update ever moves a row out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallationStatus {
    Active,
    Suspended,
    Deleted,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(format!("Unknown installation status: {}", s)),
        }
    }
}

/// A GitHub App installation as persisted locally. `user_id` is NULL for
/// provisional rows created by a webhook before any callback claim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Installation {
    /// Internal UUID
    pub id: String,
    /// GitHub installation ID (numeric, unique)
    pub installation_id: i64,
    /// Owning local user, once claimed
    pub user_id: Option<String>,
    /// GitHub account ID (numeric)
    pub account_id: i64,
    /// GitHub username or org name
    pub account_login: String,
    /// Account type: 'User' or 'Organization'
    pub account_type: String,
    pub account_avatar_url: Option<String>,
    /// Repository selection: 'all' or 'selected'
    pub repository_selection: Option<String>,
    /// JSON-encoded granted permissions
    pub permissions: Option<String>,
    /// JSON-encoded subscribed events
    pub events: Option<String>,
    pub status: String,
    pub suspended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Installation {
    pub fn status(&self) -> Option<InstallationStatus> {
        self.status.parse().ok()
    }
}

/// Response DTO for installations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationResponse {
    pub id: String,
    pub installation_id: i64,
    pub account_id: i64,
    pub account_login: String,
    pub account_type: String,
    pub account_avatar_url: Option<String>,
    pub repository_selection: Option<String>,
    pub permissions: Option<serde_json::Value>,
    pub events: Option<serde_json::Value>,
    pub status: String,
    pub suspended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Installation> for InstallationResponse {
    fn from(inst: Installation) -> Self {
        Self {
            id: inst.id,
            installation_id: inst.installation_id,
            account_id: inst.account_id,
            account_login: inst.account_login,
            account_type: inst.account_type,
            account_avatar_url: inst.account_avatar_url,
            repository_selection: inst.repository_selection,
            permissions: inst.permissions.and_then(|p| serde_json::from_str(&p).ok()),
            events: inst.events.and_then(|e| serde_json::from_str(&e).ok()),
            status: inst.status,
            suspended_at: inst.suspended_at,
            created_at: inst.created_at,
            updated_at: inst.updated_at,
        }
    }
}

/// Fields written by an upsert from the callback claim path.
#[derive(Debug, Clone)]
pub struct UpsertInstallation {
    pub installation_id: i64,
    /// Claiming user; None when inserting from the webhook path
    pub user_id: Option<String>,
    pub account_id: i64,
    pub account_login: String,
    pub account_type: String,
    pub account_avatar_url: Option<String>,
    pub repository_selection: Option<String>,
    pub permissions: Option<serde_json::Value>,
    pub events: Option<Vec<String>>,
}
