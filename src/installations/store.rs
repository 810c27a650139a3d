//! Persisted projection of GitHub App installations.

use chrono::Utc;

use crate::db::{DbPool, Installation, InstallationStatus, UpsertInstallation, UserIdentity};

/// Outcome of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    /// No row for this installation yet. Expected when a webhook races
    /// ahead of the callback; logged at warning level, never an error.
    NotFound,
    /// Row exists but is DELETED, which is terminal. No-op.
    Terminal,
}

fn encode_json<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|v| serde_json::to_string(v).ok())
}

/// Insert a provisional, unowned ACTIVE row if none exists. Returns whether
/// a row was inserted; an existing row is left untouched (idempotent, and
/// safe under concurrent duplicate deliveries).
pub async fn insert_provisional(
    pool: &DbPool,
    data: &UpsertInstallation,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO installations (
            id, installation_id, user_id, account_id, account_login, account_type,
            account_avatar_url, repository_selection, permissions, events,
            status, suspended_at, created_at, updated_at
        ) VALUES (?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, 'ACTIVE', NULL, ?, ?)
        ON CONFLICT(installation_id) DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(data.installation_id)
    .bind(data.account_id)
    .bind(&data.account_login)
    .bind(&data.account_type)
    .bind(&data.account_avatar_url)
    .bind(&data.repository_selection)
    .bind(encode_json(&data.permissions))
    .bind(encode_json(&data.events))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Create or refresh an installation row. On conflict by installation id the
/// mutable projection fields are overwritten and the row is unconditionally
/// reactivated - a (re)installation always returns to ACTIVE with the
/// suspension timestamp cleared. The first bound owner wins: the update
/// branch only fills in user_id when the row is still unowned, so a later
/// claim never re-binds an installation to a different user.
pub async fn upsert_installation(
    pool: &DbPool,
    data: &UpsertInstallation,
) -> Result<Installation, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO installations (
            id, installation_id, user_id, account_id, account_login, account_type,
            account_avatar_url, repository_selection, permissions, events,
            status, suspended_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'ACTIVE', NULL, ?, ?)
        ON CONFLICT(installation_id) DO UPDATE SET
            user_id = COALESCE(installations.user_id, excluded.user_id),
            account_login = excluded.account_login,
            account_avatar_url = excluded.account_avatar_url,
            repository_selection = excluded.repository_selection,
            permissions = excluded.permissions,
            events = excluded.events,
            status = 'ACTIVE',
            suspended_at = NULL,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(data.installation_id)
    .bind(&data.user_id)
    .bind(data.account_id)
    .bind(&data.account_login)
    .bind(&data.account_type)
    .bind(&data.account_avatar_url)
    .bind(&data.repository_selection)
    .bind(encode_json(&data.permissions))
    .bind(encode_json(&data.events))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let installation = sqlx::query_as::<_, Installation>(
        "SELECT * FROM installations WHERE installation_id = ?",
    )
    .bind(data.installation_id)
    .fetch_one(pool)
    .await?;

    Ok(installation)
}

/// Apply a status transition as a single atomic conditional update.
/// DELETED is terminal: the guard ensures no statement ever moves a row
/// out of it, so replayed or out-of-order webhook deliveries are no-ops.
pub async fn update_status(
    pool: &DbPool,
    installation_id: i64,
    status: InstallationStatus,
) -> Result<StatusUpdate, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let suspended_at = match status {
        InstallationStatus::Suspended => Some(now.clone()),
        _ => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE installations SET status = ?, suspended_at = ?, updated_at = ?
        WHERE installation_id = ? AND status != 'DELETED'
        "#,
    )
    .bind(status.as_str())
    .bind(&suspended_at)
    .bind(&now)
    .bind(installation_id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(StatusUpdate::Applied);
    }

    // Distinguish a missing row from a terminal one, for logging only.
    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM installations WHERE installation_id = ?")
            .bind(installation_id)
            .fetch_optional(pool)
            .await?;

    if exists.is_some() {
        Ok(StatusUpdate::Terminal)
    } else {
        tracing::warn!(
            installation_id,
            status = %status,
            "Installation not found, skipping status update"
        );
        Ok(StatusUpdate::NotFound)
    }
}

pub async fn get_by_installation_id(
    pool: &DbPool,
    installation_id: i64,
) -> Result<Option<Installation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM installations WHERE installation_id = ?")
        .bind(installation_id)
        .fetch_optional(pool)
        .await
}

/// ACTIVE installations owned by a user, newest first. Unowned provisional
/// rows never appear here.
pub async fn list_for_user(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<Installation>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM installations WHERE user_id = ? AND status = 'ACTIVE' ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Look up a user's linked identity for a provider.
pub async fn find_identity(
    pool: &DbPool,
    user_id: &str,
    provider: &str,
) -> Result<Option<UserIdentity>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM user_identities WHERE user_id = ? AND provider = ?")
        .bind(user_id)
        .bind(provider)
        .fetch_optional(pool)
        .await
}
