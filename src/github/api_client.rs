//! GitHub API client for installation operations.
//!
//! All upstream calls sit behind the [`InstallationApi`] trait so the
//! credential broker can be exercised in tests without a network.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::GitHubError;

/// Response from GitHub's installation access token endpoint.
#[derive(Debug, Deserialize)]
pub struct InstallationTokenResponse {
    pub token: String,
    pub expires_at: String,
    #[serde(default)]
    pub permissions: serde_json::Value,
    pub repository_selection: Option<String>,
}

/// Live installation details, fetched with an app assertion.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationDetails {
    pub id: i64,
    pub account: InstallationAccount,
    pub repository_selection: Option<String>,
    #[serde(default)]
    pub permissions: serde_json::Value,
    #[serde(default)]
    pub events: Vec<String>,
    pub suspended_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccount {
    pub id: i64,
    pub login: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub avatar_url: Option<String>,
}

/// A repository visible to an installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
    pub private: bool,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub owner_type: String,
}

#[derive(Debug, Deserialize)]
struct ListReposResponse {
    #[allow(dead_code)]
    total_count: u64,
    repositories: Vec<Repository>,
}

/// Upstream GitHub operations needed by the credential broker.
#[async_trait]
pub trait InstallationApi: Send + Sync {
    /// Exchange an app assertion for an installation access token.
    async fn create_installation_token(
        &self,
        assertion: &str,
        installation_id: i64,
    ) -> Result<InstallationTokenResponse, GitHubError>;

    /// Fetch live installation details (account, permissions, selection).
    async fn get_installation(
        &self,
        assertion: &str,
        installation_id: i64,
    ) -> Result<InstallationDetails, GitHubError>;

    /// Fetch one page of the installation's repository listing.
    async fn list_repos_page(
        &self,
        token: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Repository>, GitHubError>;
}

/// HTTP implementation of [`InstallationApi`] against the GitHub REST API.
pub struct GitHubClient {
    api_base: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(api_base: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "Grantr")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn into_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GitHubError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Upstream { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl InstallationApi for GitHubClient {
    async fn create_installation_token(
        &self,
        assertion: &str,
        installation_id: i64,
    ) -> Result<InstallationTokenResponse, GitHubError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/app/installations/{}/access_tokens", installation_id),
                assertion,
            )
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn get_installation(
        &self,
        assertion: &str,
        installation_id: i64,
    ) -> Result<InstallationDetails, GitHubError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/app/installations/{}", installation_id),
                assertion,
            )
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn list_repos_page(
        &self,
        token: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Repository>, GitHubError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!(
                    "/installation/repositories?per_page={}&page={}",
                    per_page, page
                ),
                token,
            )
            .send()
            .await?;
        let listing: ListReposResponse = Self::into_json(response).await?;
        Ok(listing.repositories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installation_details_parse_github_payload() {
        let details: InstallationDetails = serde_json::from_str(
            r#"{
                "id": 991,
                "account": {
                    "id": 42,
                    "login": "octocat",
                    "type": "User",
                    "avatar_url": "https://avatars.githubusercontent.com/u/42"
                },
                "repository_selection": "selected",
                "permissions": {"contents": "read"},
                "events": ["push"],
                "suspended_at": null
            }"#,
        )
        .unwrap();
        assert_eq!(details.id, 991);
        assert_eq!(details.account.account_type, "User");
        assert_eq!(details.repository_selection.as_deref(), Some("selected"));
        assert_eq!(details.events, vec!["push"]);
    }

    #[test]
    fn details_tolerate_missing_optional_fields() {
        let details: InstallationDetails = serde_json::from_str(
            r#"{
                "id": 1,
                "account": {"id": 2, "login": "octocat", "type": "User", "avatar_url": null},
                "repository_selection": null,
                "suspended_at": null
            }"#,
        )
        .unwrap();
        assert!(details.events.is_empty());
        assert!(details.permissions.is_null());
    }

    #[test]
    fn client_trims_trailing_slash_from_base() {
        let client = GitHubClient::new("https://api.github.com/".to_string());
        assert_eq!(client.api_base, "https://api.github.com");
    }
}
