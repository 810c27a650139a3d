use thiserror::Error;

/// Errors from the GitHub App integration layer.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Missing app id, private key, or webhook secret. The message is
    /// deliberately generic so no secret name or value leaks to callers.
    #[error("GitHub App credentials are not configured")]
    Configuration,

    /// Non-2xx response from the GitHub API.
    #[error("GitHub API error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to sign app assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),
}
