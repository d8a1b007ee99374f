//! Resource metric summarization for a target pod.
//!
//! Combines static limits/requests from the Kubernetes API with live
//! Prometheus data into the fixed-shape `METRICS` section of the
//! diagnostic context. Queries target the actual application container
//! (`container!=""`, `image!=""`) to skip sidecars and init containers,
//! and fall back to JVM heap metrics when container memory metrics are
//! missing.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::error::RcaResult;
use crate::k8s::ClusterInfo;
use crate::prometheus::{extract_value, MetricsBackend};

/// Builds the detailed resource metrics block for one pod.
pub struct MetricSummarizer {
    cluster: Arc<dyn ClusterInfo>,
    metrics: Arc<dyn MetricsBackend>,
}

impl MetricSummarizer {
    /// Create a new summarizer over the given collaborators.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterInfo>, metrics: Arc<dyn MetricsBackend>) -> Self {
        Self { cluster, metrics }
    }

    /// Summarize resource usage for `namespace/pod`.
    ///
    /// Never fails: any error during collection collapses into a
    /// single-line error string the caller embeds as opaque evidence.
    pub async fn summarize(&self, namespace: &str, pod: &str) -> String {
        info!(namespace = %namespace, pod = %pod, "Fetching detailed metrics");
        match self.try_summarize(namespace, pod).await {
            Ok(summary) => {
                info!(pod = %pod, "Metric collection success");
                summary
            }
            Err(e) => {
                error!(pod = %pod, error = %e, "Metric collection failed");
                format!("Error fetching detailed metrics: {e}")
            }
        }
    }

    #[allow(clippy::float_cmp)]
    async fn try_summarize(&self, namespace: &str, pod: &str) -> RcaResult<String> {
        let (k8s_limits, k8s_requests) = match self.cluster.get_pod_spec(namespace, pod).await? {
            Some(res) => (
                format_resources(&res.limits),
                format_resources(&res.requests),
            ),
            None => ("N/A".to_string(), "N/A".to_string()),
        };

        let selector =
            format!("pod=\"{pod}\", namespace=\"{namespace}\", container!=\"\", image!=\"\"");
        let mem_usage_query = format!("sum(container_memory_usage_bytes{{{selector}}})");
        let mem_limit_query = format!("sum(container_spec_memory_limit_bytes{{{selector}}})");
        let cpu_usage_query =
            format!("sum(rate(container_cpu_usage_seconds_total{{{selector}}}[5m]))");
        let cpu_limit_query = format!(
            "sum(container_spec_cpu_quota{{{selector}}}) / sum(container_spec_cpu_period{{{selector}}})"
        );

        let mut mem_usage_bytes = extract_value(&self.metrics.query(&mem_usage_query).await?);
        let mem_limit_bytes = extract_value(&self.metrics.query(&mem_limit_query).await?);
        let cpu_usage_cores = extract_value(&self.metrics.query(&cpu_usage_query).await?);
        let cpu_limit_cores = extract_value(&self.metrics.query(&cpu_limit_query).await?);

        // Container metrics can be absent entirely (e.g. cAdvisor gaps);
        // JVM heap usage is the next best signal for Java workloads.
        if mem_usage_bytes == 0.0 {
            info!(pod = %pod, "Container memory metrics returned 0, attempting JVM fallback");
            let jvm_query = format!(
                "sum(jvm_memory_used_bytes{{pod=\"{pod}\", namespace=\"{namespace}\", area=\"heap\"}})"
            );
            mem_usage_bytes = extract_value(&self.metrics.query(&jvm_query).await?);
        }

        let mem_percent = if mem_limit_bytes > 0.0 {
            mem_usage_bytes / mem_limit_bytes * 100.0
        } else {
            0.0
        };
        let cpu_percent = if cpu_limit_cores > 0.0 {
            cpu_usage_cores / cpu_limit_cores * 100.0
        } else {
            0.0
        };
        let mem_usage_mb = mem_usage_bytes / (1024.0 * 1024.0);
        let mem_limit_mb = mem_limit_bytes / (1024.0 * 1024.0);

        Ok(format!(
            "--- DETAILED RESOURCE METRICS ---\n\
             TARGET: {namespace}/{pod}\n\
             \n\
             K8S RESOURCE CONFIG:\n\
             \u{20} Limits:   {k8s_limits}\n\
             \u{20} Requests: {k8s_requests}\n\
             \n\
             PROMETHEUS REAL-TIME DATA:\n\
             \u{20} Memory Usage: {mem_usage_mb:.2} MB ({mem_percent:.2}% of limit)\n\
             \u{20} Memory Limit: {mem_limit_mb:.2} MB\n\
             \u{20} CPU Usage:    {cpu_usage_cores:.3} Cores ({cpu_percent:.2}% of limit)\n\
             \u{20} CPU Limit:    {cpu_limit_cores:.3} Cores\n\
             ---\n"
        ))
    }
}

/// Render a resource map as a bracket-delimited list, `N/A` when empty.
fn format_resources(resources: &BTreeMap<String, String>) -> String {
    if resources.is_empty() {
        return "N/A".to_string();
    }
    let entries: Vec<String> = resources.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("[{}]", entries.join(", "))
}
