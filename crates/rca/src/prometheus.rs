//! Prometheus client for querying workload resource metrics.
//!
//! Executes PromQL instant queries against the cluster's Prometheus and
//! exposes the result as a flat list of samples. Scalar extraction is
//! deliberately forgiving: an empty result or an unparsable sample value
//! degrades to `0.0` so a single bad series never sinks a whole metric
//! summary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{RcaError, RcaResult};
use crate::token::TokenProvider;

/// Default Prometheus service URL (internal Kubernetes DNS)
const DEFAULT_PROMETHEUS_URL: &str = "http://prometheus-server.observability.svc.cluster.local:80";

/// Configuration for the Prometheus client
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Base URL for the Prometheus API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PROMETHEUS_URL")
                .unwrap_or_else(|_| DEFAULT_PROMETHEUS_URL.to_string()),
            timeout_secs: 30,
        }
    }
}

/// Prometheus query response envelope
#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    data: PrometheusData,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    metric: HashMap<String, String>,
    value: Option<(f64, String)>,
}

/// A metric sample from an instant query
#[derive(Debug, Clone)]
pub struct MetricSample {
    /// Labels associated with this metric
    pub labels: HashMap<String, String>,
    /// The sample value
    pub value: f64,
    /// Timestamp of the sample
    pub timestamp: DateTime<Utc>,
}

/// Backend capable of answering PromQL instant queries.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Execute an instant query and return all matching samples.
    async fn query(&self, expr: &str) -> RcaResult<Vec<MetricSample>>;
}

/// Extract a scalar from an instant-query result.
///
/// Takes the first series' latest sample; an empty result yields `0.0`.
#[must_use]
pub fn extract_value(samples: &[MetricSample]) -> f64 {
    samples.first().map_or(0.0, |s| s.value)
}

/// Prometheus client for querying metrics
pub struct PrometheusClient {
    config: PrometheusConfig,
    client: reqwest::Client,
    token: Arc<TokenProvider>,
}

impl PrometheusClient {
    /// Create a new Prometheus client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: PrometheusConfig, token: Arc<TokenProvider>) -> RcaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            token,
        })
    }

    /// Check Prometheus health.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/-/healthy", self.config.base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Prometheus health check failed");
                false
            }
        }
    }

    /// Parse instant query results, degrading bad sample values to `0.0`.
    fn parse_results(results: Vec<PrometheusResult>) -> Vec<MetricSample> {
        let mut samples = Vec::new();

        for result in results {
            if let Some((timestamp, value_str)) = result.value {
                let value: f64 = value_str.parse().unwrap_or_else(|_| {
                    warn!(value = %value_str, "Unparsable sample value, using 0.0");
                    0.0
                });
                let ts = DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_else(Utc::now);

                samples.push(MetricSample {
                    labels: result.metric,
                    value,
                    timestamp: ts,
                });
            }
        }

        samples
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn query(&self, expr: &str) -> RcaResult<Vec<MetricSample>> {
        let url = format!("{}/api/v1/query", self.config.base_url.trim_end_matches('/'));

        debug!(query = %expr, "Executing Prometheus query");

        let mut request = self.client.get(&url).query(&[("query", expr)]);
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

        let prom_response: PrometheusResponse = response.json().await?;

        if prom_response.status != "success" {
            return Err(RcaError::Api {
                status: 200,
                message: format!("Prometheus query returned status: {}", prom_response.status),
            });
        }

        Ok(Self::parse_results(prom_response.data.result))
    }
}
