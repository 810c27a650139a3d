pub mod api;
pub mod config;
pub mod db;
pub mod github;
pub mod installations;

pub use db::DbPool;

use config::Config;
use github::CredentialBroker;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub broker: Arc<CredentialBroker>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, broker: Arc<CredentialBroker>) -> Self {
        Self {
            config,
            db,
            broker,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
