//! Installation credential broker.
//!
//! Exchanges app assertions for installation access tokens and caches them.
//! Concurrent cold-cache requests for the same installation may each mint a
//! token; the last write wins and both tokens stay valid upstream.

use std::sync::Arc;

use crate::api::metrics::TOKENS_MINTED_TOTAL;
use crate::config::GitHubConfig;

use super::api_client::{InstallationApi, InstallationDetails, Repository};
use super::assertion;
use super::cache::TokenCache;
use super::error::GitHubError;

/// Page size for repository listing (GitHub's maximum).
const REPOS_PER_PAGE: u32 = 100;

pub struct CredentialBroker {
    config: GitHubConfig,
    api: Arc<dyn InstallationApi>,
    cache: TokenCache,
}

impl CredentialBroker {
    pub fn new(config: GitHubConfig, api: Arc<dyn InstallationApi>, cache: TokenCache) -> Self {
        Self { config, api, cache }
    }

    /// Get an installation access token, serving from cache when a
    /// non-expired entry exists. Nothing is cached on failure.
    pub async fn installation_token(&self, installation_id: i64) -> Result<String, GitHubError> {
        if let Some(token) = self.cache.get(installation_id) {
            tracing::debug!(installation_id, "Installation token served from cache");
            return Ok(token);
        }

        let assertion = assertion::generate_assertion(&self.config)?;
        let response = self
            .api
            .create_installation_token(&assertion, installation_id)
            .await?;

        self.cache.put(installation_id, response.token.clone());
        metrics::counter!(TOKENS_MINTED_TOTAL).increment(1);
        tracing::info!(installation_id, "Installation token minted");

        Ok(response.token)
    }

    /// Evict any cached token for the installation. Called on every
    /// suspend/delete transition so stale tokens are never reused.
    pub fn invalidate_installation_token(&self, installation_id: i64) {
        if self.cache.remove(installation_id) {
            tracing::debug!(installation_id, "Cached installation token evicted");
        }
    }

    /// Fetch live installation details. Never cached: the callback path
    /// validates ownership against these and must not see stale data.
    pub async fn installation_details(
        &self,
        installation_id: i64,
    ) -> Result<InstallationDetails, GitHubError> {
        let assertion = assertion::generate_assertion(&self.config)?;
        self.api.get_installation(&assertion, installation_id).await
    }

    /// List all repositories visible to the installation, paging until a
    /// page comes back short.
    pub async fn list_installation_repos(
        &self,
        installation_id: i64,
    ) -> Result<Vec<Repository>, GitHubError> {
        let token = self.installation_token(installation_id).await?;

        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .api
                .list_repos_page(&token, REPOS_PER_PAGE, page)
                .await?;
            let last_page = (batch.len() as u32) < REPOS_PER_PAGE;
            repos.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(installation_id, count = repos.len(), "Listed installation repositories");
        Ok(repos)
    }
}


#[cfg(test)]
mod tests {
    use super::super::api_client::{
        InstallationAccount, InstallationTokenResponse, RepositoryOwner,
    };
    use super::super::cache::test_support::ManualClock;
    use super::test_support::test_config;
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        mint_calls: AtomicUsize,
        pages: Mutex<Vec<Vec<Repository>>>,
        fail_token: bool,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                mint_calls: AtomicUsize::new(0),
                pages: Mutex::new(Vec::new()),
                fail_token: false,
            }
        }

        fn with_pages(pages: Vec<Vec<Repository>>) -> Self {
            Self {
                mint_calls: AtomicUsize::new(0),
                pages: Mutex::new(pages),
                fail_token: false,
            }
        }
    }

    #[async_trait]
    impl InstallationApi for FakeApi {
        async fn create_installation_token(
            &self,
            _assertion: &str,
            installation_id: i64,
        ) -> Result<InstallationTokenResponse, GitHubError> {
            if self.fail_token {
                return Err(GitHubError::Upstream {
                    status: 404,
                    body: "Not Found".to_string(),
                });
            }
            let n = self.mint_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(InstallationTokenResponse {
                token: format!("ghs_mint_{}_{}", installation_id, n),
                expires_at: "2026-01-01T00:00:00Z".to_string(),
                permissions: serde_json::Value::Null,
                repository_selection: Some("all".to_string()),
            })
        }

        async fn get_installation(
            &self,
            _assertion: &str,
            installation_id: i64,
        ) -> Result<InstallationDetails, GitHubError> {
            Ok(InstallationDetails {
                id: installation_id,
                account: InstallationAccount {
                    id: 42,
                    login: "octocat".to_string(),
                    account_type: "User".to_string(),
                    avatar_url: None,
                },
                repository_selection: Some("all".to_string()),
                permissions: serde_json::Value::Null,
                events: vec![],
                suspended_at: None,
            })
        }

        async fn list_repos_page(
            &self,
            _token: &str,
            _per_page: u32,
            page: u32,
        ) -> Result<Vec<Repository>, GitHubError> {
            let pages = self.pages.lock();
            match pages.get((page - 1) as usize) {
                Some(batch) => Ok(batch.clone()),
                None => Ok(Vec::new()),
            }
        }
    }

    fn repo(id: u64) -> Repository {
        Repository {
            id,
            name: format!("repo-{}", id),
            full_name: format!("octocat/repo-{}", id),
            description: None,
            html_url: String::new(),
            clone_url: String::new(),
            default_branch: "main".to_string(),
            private: false,
            owner: RepositoryOwner {
                login: "octocat".to_string(),
                id: 42,
                owner_type: "User".to_string(),
            },
        }
    }

    fn broker_with(api: Arc<FakeApi>) -> CredentialBroker {
        CredentialBroker::new(
            test_config(),
            api,
            TokenCache::new(Arc::new(ManualClock::new())),
        )
    }

    #[tokio::test]
    async fn second_request_within_ttl_hits_the_cache() {
        let api = Arc::new(FakeApi::new());
        let broker = broker_with(api.clone());

        let first = broker.installation_token(991).await.unwrap();
        let second = broker.installation_token(991).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.mint_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_mint() {
        let api = Arc::new(FakeApi::new());
        let broker = broker_with(api.clone());

        broker.installation_token(991).await.unwrap();
        broker.installation_token(991).await.unwrap();
        broker.invalidate_installation_token(991);
        broker.installation_token(991).await.unwrap();

        assert_eq!(api.mint_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn upstream_failure_caches_nothing() {
        let mut api = FakeApi::new();
        api.fail_token = true;
        let api = Arc::new(api);
        let broker = broker_with(api.clone());

        let err = broker.installation_token(991).await.unwrap_err();
        assert!(matches!(err, GitHubError::Upstream { status: 404, .. }));

        // A later request goes upstream again rather than serving a phantom
        // cache entry.
        let err = broker.installation_token(991).await.unwrap_err();
        assert!(matches!(err, GitHubError::Upstream { .. }));
    }

    #[tokio::test]
    async fn repo_listing_concatenates_pages_and_stops_on_short_page() {
        let full: Vec<Repository> = (0..100).map(|i| repo(i)).collect();
        let full2: Vec<Repository> = (100..200).map(|i| repo(i)).collect();
        let full3: Vec<Repository> = (200..300).map(|i| repo(i)).collect();
        let partial: Vec<Repository> = (300..307).map(|i| repo(i)).collect();

        let api = Arc::new(FakeApi::with_pages(vec![full, full2, full3, partial]));
        let broker = broker_with(api.clone());

        let repos = broker.list_installation_repos(991).await.unwrap();
        assert_eq!(repos.len(), 307);
        assert_eq!(repos[0].id, 0);
        assert_eq!(repos[306].id, 306);
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_listing() {
        let api = Arc::new(FakeApi::with_pages(vec![]));
        let broker = broker_with(api);
        let repos = broker.list_installation_repos(991).await.unwrap();
        assert!(repos.is_empty());
    }

    #[test]
    fn missing_credentials_surface_before_any_upstream_call() {
        let api = Arc::new(FakeApi::new());
        let broker = CredentialBroker::new(
            GitHubConfig::default(),
            api.clone(),
            TokenCache::new(Arc::new(ManualClock::new())),
        );
        let err = tokio_test::block_on(broker.installation_token(1)).unwrap_err();
        assert!(matches!(err, GitHubError::Configuration));
        assert_eq!(api.mint_calls.load(Ordering::SeqCst), 0);
    }
}
