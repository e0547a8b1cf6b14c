//! Readiness predicates and the bounded polling wait.

use std::sync::Arc;
use std::time::Duration;

use meshctl_cluster::{BoxFuture, ClusterClient, ClusterObject, Manifest, ObjectKey};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::InstallError;

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The objects a wait has to see ready, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    keys: Vec<ObjectKey>,
}

impl ResourceSet {
    pub fn new(keys: Vec<ObjectKey>) -> Self {
        Self { keys }
    }

    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::new(manifest.keys())
    }

    /// Parse the applied manifest text back into the set to poll.
    pub fn parse(manifest_text: &str) -> Result<Self, InstallError> {
        let manifest =
            Manifest::parse_yaml(manifest_text).map_err(|e| InstallError::Manifest(e.to_string()))?;
        Ok(Self::from_manifest(&manifest))
    }

    pub fn keys(&self) -> &[ObjectKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub trait ReadinessWaiter: Send + Sync {
    /// Resolve once every resource is ready, or fail with
    /// [`InstallError::Timeout`] once `timeout` has elapsed. A zero timeout
    /// checks exactly once. A no-op under `dry_run`.
    fn wait_ready<'a>(
        &'a self,
        resources: &'a ResourceSet,
        timeout: Duration,
        dry_run: bool,
    ) -> BoxFuture<'a, Result<(), InstallError>>;
}

/// Polls the cluster at a fixed interval, clamped to the remaining budget.
pub struct PollingWaiter {
    client: Arc<dyn ClusterClient>,
    interval: Duration,
}

impl PollingWaiter {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            client,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn unready(&self, resources: &ResourceSet) -> Vec<ObjectKey> {
        let mut unready = Vec::new();
        for key in resources.keys() {
            let ready = match self.client.get(key).await {
                Ok(Some(object)) => is_ready(&object),
                Ok(None) => false,
                // Treated as transient; the deadline bounds it.
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "readiness check failed");
                    false
                }
            };
            if !ready {
                unready.push(key.clone());
            }
        }
        unready
    }
}

impl ReadinessWaiter for PollingWaiter {
    fn wait_ready<'a>(
        &'a self,
        resources: &'a ResourceSet,
        timeout: Duration,
        dry_run: bool,
    ) -> BoxFuture<'a, Result<(), InstallError>> {
        Box::pin(async move {
            if dry_run {
                tracing::info!("skipping readiness wait (dry run)");
                return Ok(());
            }

            // None: the timeout reaches past what the clock can represent.
            let deadline = Instant::now().checked_add(timeout);
            let mut polls = 0u32;
            loop {
                let unready = self.unready(resources).await;
                polls = polls.saturating_add(1);
                if unready.is_empty() {
                    tracing::info!(resources = resources.len(), polls, "all resources ready");
                    return Ok(());
                }

                let now = Instant::now();
                let pause = match deadline {
                    Some(deadline) if now >= deadline => {
                        return Err(InstallError::Timeout {
                            timeout,
                            unready: unready.iter().map(ToString::to_string).collect(),
                        });
                    }
                    Some(deadline) => self.interval.min(deadline - now),
                    None => self.interval,
                };
                tracing::debug!(unready = unready.len(), "waiting for resources");
                tokio::time::sleep(pause).await;
            }
        })
    }
}

// ── Predicates ─────────────────────────────────────────────────────────────

/// Whether the cluster reports `object` as usable.
pub fn is_ready(object: &ClusterObject) -> bool {
    match object.kind.as_str() {
        "Namespace" => object.status.get("phase").and_then(Value::as_str) == Some("Active"),
        "Deployment" => deployment_ready(object),
        "DaemonSet" => daemonset_ready(object),
        "Pod" => pod_ready(object),
        "Service" => service_ready(object),
        _ => true,
    }
}

fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    meshctl_core::tree::get_path(value, path).and_then(Value::as_i64)
}

fn deployment_ready(object: &ClusterObject) -> bool {
    let replicas = int_at(&object.spec, &["replicas"]).unwrap_or(1).max(0);
    let max_unavailable = meshctl_core::tree::get_path(
        &object.spec,
        &["strategy", "rollingUpdate", "maxUnavailable"],
    )
    .map_or(0, |v| scaled_value(v, replicas));
    let ready = int_at(&object.status, &["readyReplicas"]).unwrap_or(0);
    ready >= (replicas - max_unavailable).max(0)
}

/// An int-or-percent field resolved against `total`, percentages rounded
/// down.
fn scaled_value(value: &Value, total: i64) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s
            .strip_suffix('%')
            .and_then(|pct| pct.trim().parse::<i64>().ok())
            .map_or(0, |pct| total * pct / 100),
        _ => 0,
    }
}

fn daemonset_ready(object: &ClusterObject) -> bool {
    // No status means no controller has looked at it yet.
    if object.status.is_null() {
        return false;
    }
    let desired = int_at(&object.status, &["desiredNumberScheduled"]).unwrap_or(0);
    let ready = int_at(&object.status, &["numberReady"]).unwrap_or(0);
    ready >= desired
}

fn pod_ready(object: &ClusterObject) -> bool {
    object
        .status
        .get("conditions")
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Ready")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        })
}

fn service_ready(object: &ClusterObject) -> bool {
    let service_type = object.spec.get("type").and_then(Value::as_str).unwrap_or("ClusterIP");
    if service_type == "ExternalName" {
        return true;
    }
    // Headless services ("None") count as having an address.
    let has_cluster_ip = object
        .spec
        .get("clusterIP")
        .and_then(Value::as_str)
        .is_some_and(|ip| !ip.is_empty());
    if !has_cluster_ip {
        return false;
    }
    if service_type == "LoadBalancer" {
        return meshctl_core::tree::get_path(&object.status, &["loadBalancer", "ingress"])
            .and_then(Value::as_array)
            .is_some_and(|ingress| !ingress.is_empty());
    }
    true
}
