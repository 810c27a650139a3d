use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Public base URL when running behind a tunnel or reverse proxy
    pub external_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            external_url: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// GitHub App credentials. All three secrets are required for the broker and
/// webhook paths to operate; absence surfaces as a configuration error at
/// call time rather than a startup failure.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Numeric GitHub App ID (the JWT issuer)
    pub app_id: Option<i64>,
    /// App private key, either raw PEM or base64-encoded PEM
    pub private_key: Option<String>,
    /// Shared secret for webhook signature verification (HMAC-SHA256)
    pub webhook_secret: Option<String>,
    /// GitHub API base URL (override for GitHub Enterprise)
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            webhook_secret: None,
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_github_credentials_unset() {
        let config = Config::default();
        assert!(config.github.app_id.is_none());
        assert!(config.github.private_key.is_none());
        assert!(config.github.webhook_secret.is_none());
        assert_eq!(config.github.api_base, "https://api.github.com");
    }

    #[test]
    fn parses_github_section() {
        let config: Config = toml::from_str(
            r#"
            [github]
            app_id = 12345
            private_key = "LS0tLS1CRUdJTg=="
            webhook_secret = "hush"
            "#,
        )
        .unwrap();
        assert_eq!(config.github.app_id, Some(12345));
        assert_eq!(config.github.webhook_secret.as_deref(), Some("hush"));
        assert_eq!(config.auth.session_ttl_days, 7);
    }
}
