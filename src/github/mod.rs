//! GitHub App integration.
//!
//! This module provides:
//! - RS256 app assertion (JWT) signing
//! - Installation access token brokering with an in-process TTL cache
//! - Webhook signature verification
//! - A thin GitHub API client for installation operations

pub mod api_client;
pub mod assertion;
pub mod broker;
pub mod cache;
pub mod error;
pub mod webhook;

pub use api_client::{GitHubClient, InstallationApi, InstallationDetails, Repository};
pub use broker::CredentialBroker;
pub use cache::{Clock, SystemClock, TokenCache};
pub use error::GitHubError;
pub use webhook::verify_webhook_signature;
