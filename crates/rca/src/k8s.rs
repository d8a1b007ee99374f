//! Kubernetes cluster access for pod status, events and logs.
//!
//! Wraps the kube client behind the [`ClusterInfo`] trait so the
//! collector and scanner can be exercised against stub clusters in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::Client;
use tracing::debug;

use crate::error::RcaResult;

/// Static resource configuration of a pod's primary container.
#[derive(Debug, Clone, Default)]
pub struct PodResources {
    /// Resource limits, by resource name (e.g. `cpu`, `memory`).
    pub limits: BTreeMap<String, String>,
    /// Resource requests, by resource name.
    pub requests: BTreeMap<String, String>,
}

/// Snapshot of a pod's runtime status.
#[derive(Debug, Clone, Default)]
pub struct PodStatusInfo {
    /// Pod phase (Running, Pending, Failed, ...)
    pub phase: String,
    /// Per-container status
    pub containers: Vec<ContainerStatusInfo>,
}

/// Runtime status of one container in a pod.
#[derive(Debug, Clone, Default)]
pub struct ContainerStatusInfo {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    /// Present when the container is currently waiting
    pub waiting: Option<WaitingState>,
    /// Present when a previous instance terminated
    pub last_terminated: Option<TerminatedState>,
}

/// Waiting container state details.
#[derive(Debug, Clone, Default)]
pub struct WaitingState {
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// Terminated container state details.
#[derive(Debug, Clone, Default)]
pub struct TerminatedState {
    pub reason: Option<String>,
    pub exit_code: i32,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A Kubernetes event related to a pod.
#[derive(Debug, Clone)]
pub struct PodEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: String,
    pub reason: String,
    pub message: String,
}

/// Reference to a pod found by the workload scanner.
#[derive(Debug, Clone)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

/// Cluster collaborator consumed by the collector and scanner.
#[async_trait]
pub trait ClusterInfo: Send + Sync {
    /// Resource limits/requests of the pod's primary container, or `None`
    /// if the pod does not exist.
    async fn get_pod_spec(&self, namespace: &str, name: &str) -> RcaResult<Option<PodResources>>;

    /// Pod status snapshot, or `None` if the pod does not exist.
    async fn get_pod_status(&self, namespace: &str, name: &str)
        -> RcaResult<Option<PodStatusInfo>>;

    /// Events in the namespace involving the named pod, in API list order.
    async fn get_events(&self, namespace: &str, pod: &str) -> RcaResult<Vec<PodEvent>>;

    /// Pod logs, tail-capped; `previous` selects the last terminated
    /// container instance.
    async fn get_logs(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: i64,
        previous: bool,
    ) -> RcaResult<String>;

    /// Pods across all namespaces matching a label selector.
    async fn list_labeled_pods(&self, selector: &str) -> RcaResult<Vec<PodRef>>;
}

/// kube-backed [`ClusterInfo`] implementation.
#[derive(Clone)]
pub struct KubeClusterInfo {
    client: Client,
}

impl KubeClusterInfo {
    /// Wrap an existing kube client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterInfo for KubeClusterInfo {
    async fn get_pod_spec(&self, namespace: &str, name: &str) -> RcaResult<Option<PodResources>> {
        let Some(pod) = self.pods(namespace).get_opt(name).await? else {
            return Ok(None);
        };

        let mut resources = PodResources::default();
        if let Some(container) = pod.spec.and_then(|s| s.containers.into_iter().next()) {
            if let Some(reqs) = container.resources {
                if let Some(limits) = reqs.limits {
                    resources.limits = limits.into_iter().map(|(k, v)| (k, v.0)).collect();
                }
                if let Some(requests) = reqs.requests {
                    resources.requests = requests.into_iter().map(|(k, v)| (k, v.0)).collect();
                }
            }
        }
        Ok(Some(resources))
    }

    async fn get_pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> RcaResult<Option<PodStatusInfo>> {
        let Some(pod) = self.pods(namespace).get_opt(name).await? else {
            return Ok(None);
        };

        let Some(status) = pod.status else {
            return Ok(Some(PodStatusInfo::default()));
        };

        let containers = status
            .container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(|cs| {
                let waiting = cs
                    .state
                    .as_ref()
                    .and_then(|s| s.waiting.as_ref())
                    .map(|w| WaitingState {
                        reason: w.reason.clone(),
                        message: w.message.clone(),
                    });
                let last_terminated = cs
                    .last_state
                    .as_ref()
                    .and_then(|s| s.terminated.as_ref())
                    .map(|t| TerminatedState {
                        reason: t.reason.clone(),
                        exit_code: t.exit_code,
                        finished_at: t.finished_at.as_ref().map(|time| time.0),
                    });
                ContainerStatusInfo {
                    name: cs.name,
                    ready: cs.ready,
                    restart_count: cs.restart_count,
                    waiting,
                    last_terminated,
                }
            })
            .collect();

        Ok(Some(PodStatusInfo {
            phase: status.phase.unwrap_or_default(),
            containers,
        }))
    }

    async fn get_events(&self, namespace: &str, pod: &str) -> RcaResult<Vec<PodEvent>> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let list = events.list(&ListParams::default()).await?;

        let matching = list
            .items
            .into_iter()
            .filter(|e| e.involved_object.name.as_deref() == Some(pod))
            .map(|e| PodEvent {
                timestamp: e.last_timestamp.map(|t| t.0),
                event_type: e.type_.unwrap_or_default(),
                reason: e.reason.unwrap_or_default(),
                message: e.message.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(pod = %pod, count = matching.len(), "Gathered pod events");
        Ok(matching)
    }

    async fn get_logs(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: i64,
        previous: bool,
    ) -> RcaResult<String> {
        let params = LogParams {
            tail_lines: Some(tail_lines),
            previous,
            ..LogParams::default()
        };
        Ok(self.pods(namespace).logs(name, &params).await?)
    }

    async fn list_labeled_pods(&self, selector: &str) -> RcaResult<Vec<PodRef>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let lp = ListParams::default().labels(selector);
        let list = pods.list(&lp).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|p| {
                let name = p.metadata.name?;
                let namespace = p.metadata.namespace?;
                Some(PodRef { namespace, name })
            })
            .collect())
    }
}
