//! Cryostat client for fetching JFR analysis reports.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RcaError, RcaResult};
use crate::token::TokenProvider;

/// Default Cryostat service URL (internal Kubernetes DNS)
const DEFAULT_CRYOSTAT_URL: &str = "http://cryostat.observability.svc.cluster.local:8181";

/// Configuration for the Cryostat client
#[derive(Debug, Clone)]
pub struct CryostatConfig {
    /// Base URL for the Cryostat API
    pub base_url: String,
    /// Whether JFR analysis is enabled at all
    pub enabled: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CryostatConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("CRYOSTAT_URL")
                .unwrap_or_else(|_| DEFAULT_CRYOSTAT_URL.to_string()),
            enabled: std::env::var("CRYOSTAT_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            timeout_secs: 60,
        }
    }
}

/// Backend providing JVM profiling reports for a target workload.
#[async_trait]
pub trait ProfilingBackend: Send + Sync {
    /// Fetch the profiling analysis report for a target.
    async fn get_report(&self, target: &str) -> RcaResult<String>;
}

/// Cryostat client for fetching JFR reports
pub struct CryostatClient {
    config: CryostatConfig,
    client: reqwest::Client,
    token: Arc<TokenProvider>,
}

impl CryostatClient {
    /// Create a new Cryostat client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: CryostatConfig, token: Arc<TokenProvider>) -> RcaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            token,
        })
    }
}

#[async_trait]
impl ProfilingBackend for CryostatClient {
    async fn get_report(&self, target: &str) -> RcaResult<String> {
        let url = format!(
            "{}/api/v1/targets/{target}/reports",
            self.config.base_url.trim_end_matches('/')
        );

        debug!(target = %target, "Fetching JFR report from Cryostat");

        let mut request = self.client.get(&url);
        let bearer = self.token.bearer();
        if !bearer.is_empty() {
            request = request.header("Authorization", bearer);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RcaError::Api { status, message });
        }

        Ok(response.text().await?)
    }
}
