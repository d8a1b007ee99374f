//! Periodic workload scanner driving analyses across labeled pods.
//!
//! Finds pods carrying the configured label (set on the pod template of
//! Deployments/StatefulSets/DaemonSets) and runs the full pipeline for
//! each. A failing analysis is logged and never stops the remaining
//! targets.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::RcaResult;
use crate::k8s::ClusterInfo;
use crate::pipeline::RcaPipeline;

/// Outcome counts for one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Pods matching the label selector
    pub pods_found: usize,
    /// Analyses that produced a report
    pub analyzed: usize,
    /// Analyses that failed
    pub failed: usize,
}

/// Scans labeled workloads and runs the pipeline per pod.
pub struct WorkloadScanner {
    cluster: Arc<dyn ClusterInfo>,
    pipeline: Arc<RcaPipeline>,
    label: String,
}

impl WorkloadScanner {
    /// Create a scanner for pods matching `label` (`key=value`).
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterInfo>, pipeline: Arc<RcaPipeline>, label: &str) -> Self {
        Self {
            cluster,
            pipeline,
            label: label.to_string(),
        }
    }

    /// Run one scan pass.
    ///
    /// # Errors
    /// Returns an error only when the pod listing itself fails;
    /// per-target analysis failures are counted, not raised.
    pub async fn scan(&self) -> RcaResult<ScanSummary> {
        info!(label = %self.label, "Starting workload scan");

        let pods = self.cluster.list_labeled_pods(&self.label).await?;
        if pods.is_empty() {
            info!(label = %self.label, "No pods found with label");
            return Ok(ScanSummary::default());
        }

        info!(count = pods.len(), "Found pods to analyze");
        let mut summary = ScanSummary {
            pods_found: pods.len(),
            ..ScanSummary::default()
        };

        for pod in pods {
            info!(namespace = %pod.namespace, pod = %pod.name, "Starting analysis for pod");
            match self.pipeline.run_analysis(&pod.namespace, &pod.name).await {
                Ok(report) => {
                    info!(pod = %pod.name, decision = %report.issue, "Analysis completed");
                    summary.analyzed += 1;
                }
                Err(e) => {
                    error!(pod = %pod.name, error = %e, "Error analyzing pod");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
