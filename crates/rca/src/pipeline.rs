//! The staged diagnostic pipeline: collect, detect, analyze, validate.
//!
//! Each stage is one synchronous call with no internal retries; a failing
//! reasoning call propagates to the caller, which owns the retry/skip
//! decision. The healthy case short-circuits after detection so the two
//! expensive reasoning stages never run for it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::ai::{AnomalyDetector, ReportValidator, RootCauseAnalyst};
use crate::collector::DataCollector;
use crate::error::RcaResult;
use crate::report::RcaReport;

/// Drives one full analysis run per invocation; holds no per-run state.
pub struct RcaPipeline {
    collector: DataCollector,
    detector: Arc<dyn AnomalyDetector>,
    analyst: Arc<dyn RootCauseAnalyst>,
    validator: Arc<dyn ReportValidator>,
}

impl RcaPipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        collector: DataCollector,
        detector: Arc<dyn AnomalyDetector>,
        analyst: Arc<dyn RootCauseAnalyst>,
        validator: Arc<dyn ReportValidator>,
    ) -> Self {
        Self {
            collector,
            detector,
            analyst,
            validator,
        }
    }

    /// Run the full analysis for `namespace/pod`.
    ///
    /// # Errors
    /// Returns an error when a reasoning capability call fails; collection
    /// failures never surface here (they are embedded in the context).
    pub async fn run_analysis(&self, namespace: &str, pod: &str) -> RcaResult<RcaReport> {
        info!(namespace = %namespace, pod = %pod, "Starting RCA analysis");

        let ctx = self.collector.collect(namespace, pod).await;
        info!(
            metrics_len = ctx.metrics.len(),
            context_len = ctx.full_context.len(),
            "Data collection complete"
        );

        info!("Step 1: running anomaly detection");
        debug!(context = %ctx.full_context, "Context for anomaly detection");
        let raw_anomaly = self.detector.detect(&ctx.full_context).await?;
        info!(raw = %raw_anomaly, "Raw anomaly detector response");

        let anomaly = sanitize_anomaly(&raw_anomaly);
        info!(anomaly = %anomaly, "Sanitized anomaly token");

        if is_healthy(&anomaly) {
            info!("System is healthy or no anomaly detected, skipping RCA and validation");
            return Ok(RcaReport::healthy());
        }

        info!("Step 2: running root cause analysis");
        let rca_output = self.analyst.analyze(&anomaly, &ctx.full_context).await?;
        info!(length = rca_output.len(), "Raw RCA result");

        info!("Step 3: running validation and formatting");
        let report = self
            .validator
            .validate_and_format(&rca_output, &ctx.full_context)
            .await?;
        info!(title = %report.title, "Final report produced");

        Ok(report)
    }
}

/// Sanitize raw classifier output into an anomaly token: first line,
/// stripped of any `#` comment remainder, trimmed.
#[must_use]
pub fn sanitize_anomaly(raw: &str) -> String {
    raw.split('\n')
        .next()
        .unwrap_or("")
        .split('#')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Permissive healthy match: empty token or any mention of HEALTHY,
/// case-insensitive. Tolerates verbose classifier phrasing at the cost of
/// false negatives on descriptions that merely mention the word.
fn is_healthy(token: &str) -> bool {
    token.is_empty() || token.to_uppercase().contains("HEALTHY")
}
