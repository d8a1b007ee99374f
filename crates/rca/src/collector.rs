//! Diagnostic context aggregation for a target pod.
//!
//! Gathers pod status, events, metrics, logs and profiling data into one
//! labeled text block for the reasoning stages. Every source is
//! individually fault-tolerant: a failing fetch becomes an inline error
//! string for that section only, so the pipeline always receives a
//! complete context.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{error, info};

use crate::cryostat::ProfilingBackend;
use crate::k8s::{ClusterInfo, PodEvent, PodStatusInfo};
use crate::metrics::MetricSummarizer;

/// The aggregated diagnostic context for one analysis run.
///
/// Immutable once built; `full_context` is always the deterministic
/// concatenation of the five section fields.
#[derive(Debug, Clone)]
pub struct DiagnosticContext {
    /// Pod phase and per-container state
    pub pod_status: String,
    /// Kubernetes events involving the pod
    pub events: String,
    /// Detailed resource metrics block
    pub metrics: String,
    /// Tail of the pod's logs
    pub logs: String,
    /// JFR profiling analysis
    pub profiling: String,
    /// All sections concatenated under fixed headers
    pub full_context: String,
}

impl DiagnosticContext {
    fn assemble(
        pod_status: String,
        events: String,
        metrics: String,
        logs: String,
        profiling: String,
    ) -> Self {
        let full_context = format!(
            "--- POD STATUS ---\n{pod_status}\n\n\
             --- K8S EVENTS ---\n{events}\n\n\
             --- METRICS ---\n{metrics}\n\n\
             --- LOGS (Tail) ---\n{logs}\n\n\
             --- JFR ANALYSIS ---\n{profiling}\n"
        );
        Self {
            pod_status,
            events,
            metrics,
            logs,
            profiling,
            full_context,
        }
    }
}

/// Collects diagnostic data from all sources for one pod.
pub struct DataCollector {
    cluster: Arc<dyn ClusterInfo>,
    summarizer: MetricSummarizer,
    profiling: Arc<dyn ProfilingBackend>,
    profiling_enabled: bool,
    log_tail_lines: i64,
}

impl DataCollector {
    /// Create a new collector over the given collaborators.
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterInfo>,
        summarizer: MetricSummarizer,
        profiling: Arc<dyn ProfilingBackend>,
        profiling_enabled: bool,
        log_tail_lines: i64,
    ) -> Self {
        Self {
            cluster,
            summarizer,
            profiling,
            profiling_enabled,
            log_tail_lines,
        }
    }

    /// Collect all diagnostic sections for `namespace/pod`.
    ///
    /// Always succeeds; individual fetch failures are embedded as inline
    /// error strings in their section.
    pub async fn collect(&self, namespace: &str, pod: &str) -> DiagnosticContext {
        info!(namespace = %namespace, pod = %pod, "Starting data collection");

        let pod_status = self.fetch_pod_status(namespace, pod).await;
        let events = self.fetch_events(namespace, pod).await;
        let metrics = self.summarizer.summarize(namespace, pod).await;
        let logs = self.fetch_logs(namespace, pod).await;
        let profiling = self.fetch_profiling(pod).await;

        DiagnosticContext::assemble(pod_status, events, metrics, logs, profiling)
    }

    async fn fetch_pod_status(&self, namespace: &str, pod: &str) -> String {
        info!(pod = %pod, "Fetching pod status");
        match self.cluster.get_pod_status(namespace, pod).await {
            Ok(Some(status)) => format_pod_status(&status),
            Ok(None) => "Pod not found".to_string(),
            Err(e) => {
                error!(pod = %pod, error = %e, "Failed to fetch pod status");
                format!("Error fetching pod status: {e}")
            }
        }
    }

    async fn fetch_events(&self, namespace: &str, pod: &str) -> String {
        info!(pod = %pod, "Fetching events");
        match self.cluster.get_events(namespace, pod).await {
            Ok(events) if events.is_empty() => "No events found for this pod.".to_string(),
            Ok(events) => {
                info!(pod = %pod, count = events.len(), "Gathered events");
                format_events(&events)
            }
            Err(e) => {
                error!(pod = %pod, error = %e, "Failed to fetch events");
                format!("Error fetching events: {e}")
            }
        }
    }

    async fn fetch_logs(&self, namespace: &str, pod: &str) -> String {
        info!(pod = %pod, "Fetching logs");
        let current = match self
            .cluster
            .get_logs(namespace, pod, self.log_tail_lines, false)
            .await
        {
            Ok(logs) => logs,
            Err(e) => {
                error!(pod = %pod, error = %e, "Failed to fetch logs");
                return format!("Error fetching logs: {e}");
            }
        };

        if !current.trim().is_empty() {
            info!(pod = %pod, length = current.len(), "Gathered logs");
            return current;
        }

        // Freshly restarted containers often have nothing yet; the
        // previous instance usually holds the crash output.
        info!(pod = %pod, "Current logs empty, fetching previous container logs");
        match self
            .cluster
            .get_logs(namespace, pod, self.log_tail_lines, true)
            .await
        {
            Ok(previous) if !previous.is_empty() => previous,
            Ok(_) => "No logs available (even from terminated container)".to_string(),
            Err(e) => {
                error!(pod = %pod, error = %e, "Failed to fetch previous logs");
                format!("Error fetching logs: {e}")
            }
        }
    }

    async fn fetch_profiling(&self, pod: &str) -> String {
        if !self.profiling_enabled {
            info!("Cryostat is disabled, skipping JFR analysis fetch");
            return "JFR Analysis is disabled.".to_string();
        }
        match self.profiling.get_report(pod).await {
            Ok(report) => {
                info!(pod = %pod, length = report.len(), "Gathered JFR report");
                report
            }
            Err(e) => {
                error!(pod = %pod, error = %e, "Failed to fetch JFR report");
                format!("Error fetching JFR analysis: {e}")
            }
        }
    }
}

fn format_pod_status(status: &PodStatusInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Phase: {}", status.phase);
    for container in &status.containers {
        let _ = writeln!(out, "Container: {}", container.name);
        let _ = writeln!(out, "  Ready: {}", container.ready);
        let _ = writeln!(out, "  Restart Count: {}", container.restart_count);
        if let Some(waiting) = &container.waiting {
            let _ = writeln!(
                out,
                "  Current State: Waiting ({})",
                waiting.reason.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(
                out,
                "  Message: {}",
                waiting.message.as_deref().unwrap_or("")
            );
        }
        if let Some(terminated) = &container.last_terminated {
            let _ = writeln!(
                out,
                "  Last State: Terminated ({})",
                terminated.reason.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(out, "  Exit Code: {}", terminated.exit_code);
            let _ = writeln!(
                out,
                "  Finished At: {}",
                terminated
                    .finished_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default()
            );
        }
    }
    out
}

fn format_events(events: &[PodEvent]) -> String {
    let mut out = String::new();
    for event in events {
        let timestamp = event
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "[{timestamp}] Type: {}, Reason: {}, Message: {}",
            event.event_type, event.reason, event.message
        );
    }
    out
}
