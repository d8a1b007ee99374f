//! Stub collaborator implementations shared across module tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::ai::{AnomalyDetector, ReportValidator, RootCauseAnalyst};
use crate::cryostat::ProfilingBackend;
use crate::error::{RcaError, RcaResult};
use crate::k8s::{
    ClusterInfo, ContainerStatusInfo, PodEvent, PodRef, PodResources, PodStatusInfo,
};
use crate::prometheus::{MetricSample, MetricsBackend};
use crate::report::RcaReport;

fn backend_error(message: &str) -> RcaError {
    RcaError::Api {
        status: 500,
        message: message.to_string(),
    }
}

/// Scriptable in-memory cluster.
pub struct StubCluster {
    pub resources: Option<PodResources>,
    pub status: Option<PodStatusInfo>,
    pub events: Vec<PodEvent>,
    pub logs: String,
    pub previous_logs: String,
    pub pods: Vec<PodRef>,
    pub fail_spec: bool,
    pub fail_status: bool,
    pub fail_events: bool,
    pub fail_logs: bool,
}

impl Default for StubCluster {
    fn default() -> Self {
        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), "500m".to_string());
        limits.insert("memory".to_string(), "512Mi".to_string());
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), "250m".to_string());
        requests.insert("memory".to_string(), "256Mi".to_string());

        Self {
            resources: Some(PodResources { limits, requests }),
            status: Some(PodStatusInfo {
                phase: "Running".to_string(),
                containers: vec![ContainerStatusInfo {
                    name: "app".to_string(),
                    ready: true,
                    restart_count: 0,
                    waiting: None,
                    last_terminated: None,
                }],
            }),
            events: vec![PodEvent {
                timestamp: None,
                event_type: "Normal".to_string(),
                reason: "Started".to_string(),
                message: "Started container app".to_string(),
            }],
            logs: "app started\n".to_string(),
            previous_logs: String::new(),
            pods: Vec::new(),
            fail_spec: false,
            fail_status: false,
            fail_events: false,
            fail_logs: false,
        }
    }
}

#[async_trait]
impl ClusterInfo for StubCluster {
    async fn get_pod_spec(&self, _ns: &str, _name: &str) -> RcaResult<Option<PodResources>> {
        if self.fail_spec {
            return Err(backend_error("stub spec failure"));
        }
        Ok(self.resources.clone())
    }

    async fn get_pod_status(&self, _ns: &str, _name: &str) -> RcaResult<Option<PodStatusInfo>> {
        if self.fail_status {
            return Err(backend_error("stub status failure"));
        }
        Ok(self.status.clone())
    }

    async fn get_events(&self, _ns: &str, _pod: &str) -> RcaResult<Vec<PodEvent>> {
        if self.fail_events {
            return Err(backend_error("stub events failure"));
        }
        Ok(self.events.clone())
    }

    async fn get_logs(
        &self,
        _ns: &str,
        _name: &str,
        _tail_lines: i64,
        previous: bool,
    ) -> RcaResult<String> {
        if self.fail_logs {
            return Err(backend_error("stub logs failure"));
        }
        if previous {
            Ok(self.previous_logs.clone())
        } else {
            Ok(self.logs.clone())
        }
    }

    async fn list_labeled_pods(&self, _selector: &str) -> RcaResult<Vec<PodRef>> {
        Ok(self.pods.clone())
    }
}

/// Scriptable metrics backend recording every query it answers.
#[derive(Default)]
pub struct StubMetrics {
    values: Vec<(String, f64)>,
    fail: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StubMetrics {
    /// Answer queries mentioning `metric` with a single sample of `value`.
    pub fn with_value(mut self, metric: &str, value: f64) -> Self {
        self.values.push((metric.to_string(), value));
        self
    }

    /// Make every query fail with the given message.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }

    /// All queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsBackend for StubMetrics {
    async fn query(&self, expr: &str) -> RcaResult<Vec<MetricSample>> {
        self.queries.lock().unwrap().push(expr.to_string());
        if let Some(message) = &self.fail {
            return Err(backend_error(message));
        }
        Ok(self
            .values
            .iter()
            .find(|(metric, _)| expr.contains(metric.as_str()))
            .map(|(_, value)| {
                vec![MetricSample {
                    labels: HashMap::new(),
                    value: *value,
                    timestamp: Utc::now(),
                }]
            })
            .unwrap_or_default())
    }
}

/// Scriptable profiling backend.
pub struct StubProfiling {
    pub report: String,
    pub fail: bool,
}

impl Default for StubProfiling {
    fn default() -> Self {
        Self {
            report: "JFR: allocation pressure nominal".to_string(),
            fail: false,
        }
    }
}

#[async_trait]
impl ProfilingBackend for StubProfiling {
    async fn get_report(&self, _target: &str) -> RcaResult<String> {
        if self.fail {
            return Err(backend_error("stub profiling failure"));
        }
        Ok(self.report.clone())
    }
}

/// Detector returning a fixed raw response, counting invocations.
pub struct ScriptedDetector {
    response: String,
    pub calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AnomalyDetector for ScriptedDetector {
    async fn detect(&self, _context: &str) -> RcaResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Detector that fails when the context mentions a marker string.
pub struct SelectiveDetector {
    fail_marker: String,
}

impl SelectiveDetector {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: marker.to_string(),
        }
    }
}

#[async_trait]
impl AnomalyDetector for SelectiveDetector {
    async fn detect(&self, context: &str) -> RcaResult<String> {
        if context.contains(&self.fail_marker) {
            return Err(RcaError::ModelOutput("detector exploded".to_string()));
        }
        Ok("HEALTHY".to_string())
    }
}

/// Analyst returning a fixed analysis, recording what it was asked.
pub struct ScriptedAnalyst {
    response: String,
    pub calls: AtomicUsize,
    pub seen_anomaly: Mutex<Option<String>>,
}

impl ScriptedAnalyst {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
            seen_anomaly: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RootCauseAnalyst for ScriptedAnalyst {
    async fn analyze(&self, anomaly: &str, _context: &str) -> RcaResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_anomaly.lock().unwrap() = Some(anomaly.to_string());
        Ok(self.response.clone())
    }
}

/// Validator returning a fixed report, counting invocations.
pub struct ScriptedValidator {
    report: RcaReport,
    pub calls: AtomicUsize,
}

impl ScriptedValidator {
    pub fn new(report: RcaReport) -> Self {
        Self {
            report,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReportValidator for ScriptedValidator {
    async fn validate_and_format(
        &self,
        _rca_output: &str,
        _context: &str,
    ) -> RcaResult<RcaReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }
}
