use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grantr::config::Config;
use grantr::github::{CredentialBroker, GitHubClient, SystemClock, TokenCache};
use grantr::AppState;

#[derive(Parser, Debug)]
#[command(name = "grantr")]
#[command(author, version, about = "A GitHub App installation and credential broker", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "grantr.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Grantr v{}", env!("CARGO_PKG_VERSION"));

    if config.github.app_id.is_none() || config.github.private_key.is_none() {
        tracing::warn!("GitHub App credentials are not configured; token endpoints will fail");
    }
    if config.github.webhook_secret.is_none() {
        tracing::warn!("Webhook secret is not configured; all webhook deliveries will be rejected");
    }

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Initialize database
    let db = grantr::db::init(&config.server.data_dir).await?;

    // Install the Prometheus recorder
    let metrics_handle = grantr::api::metrics::init_metrics()?;

    // Build the credential broker
    let api = Arc::new(GitHubClient::new(config.github.api_base.clone()));
    let cache = TokenCache::new(Arc::new(SystemClock));
    let broker = Arc::new(CredentialBroker::new(config.github.clone(), api, cache));

    // Create app state and router
    let state = Arc::new(
        AppState::new(config.clone(), db, broker).with_metrics(metrics_handle),
    );
    let app = grantr::api::create_router(state);

    // Start API server
    let api_addr = format!("{}:{}", config.server.host, config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;

    tracing::info!("API server listening on http://{}", api_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
