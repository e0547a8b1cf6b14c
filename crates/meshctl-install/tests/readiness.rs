mod common;

use std::time::Duration;

use meshctl_cluster::{ClusterObject, MemoryCluster};
use meshctl_install::{is_ready, InstallError, PollingWaiter, ReadinessWaiter, ResourceSet};
use serde_json::json;
use tokio::time::Instant;

use common::shared;

fn deployment(name: &str, replicas: u32) -> ClusterObject {
    ClusterObject::new("apps/v1", "Deployment", name)
        .in_namespace("mesh-system")
        .with_spec(json!({
            "replicas": replicas,
            "strategy": { "rollingUpdate": { "maxUnavailable": "25%" } },
        }))
}

#[test]
fn deployment_needs_ready_replicas_minus_max_unavailable() {
    let mut object = deployment("meshd", 4);
    assert!(!is_ready(&object));

    // 25% of 4 may be unavailable.
    object.status = json!({"readyReplicas": 3});
    assert!(is_ready(&object));

    object.status = json!({"readyReplicas": 2});
    assert!(!is_ready(&object));

    object.spec["strategy"]["rollingUpdate"]["maxUnavailable"] = json!(2);
    assert!(is_ready(&object));
}

#[test]
fn single_replica_percentage_rounds_down() {
    let mut object = deployment("meshd", 1);
    object.status = json!({"readyReplicas": 0});
    assert!(!is_ready(&object));
    object.status = json!({"readyReplicas": 1});
    assert!(is_ready(&object));
}

#[test]
fn daemonset_needs_status() {
    let mut object = ClusterObject::new("apps/v1", "DaemonSet", "mesh-cni-node").in_namespace("kube-system");
    assert!(!is_ready(&object));

    object.status = json!({"desiredNumberScheduled": 3, "numberReady": 2});
    assert!(!is_ready(&object));
    object.status = json!({"desiredNumberScheduled": 3, "numberReady": 3});
    assert!(is_ready(&object));
}

#[test]
fn service_readiness_depends_on_type() {
    let external = ClusterObject::new("v1", "Service", "ext").with_spec(json!({"type": "ExternalName"}));
    assert!(is_ready(&external));

    let pending = ClusterObject::new("v1", "Service", "svc").with_spec(json!({"type": "ClusterIP"}));
    assert!(!is_ready(&pending));

    let headless = ClusterObject::new("v1", "Service", "svc").with_spec(json!({"clusterIP": "None"}));
    assert!(is_ready(&headless));

    let mut lb = ClusterObject::new("v1", "Service", "gw")
        .with_spec(json!({"type": "LoadBalancer", "clusterIP": "10.96.0.10"}));
    assert!(!is_ready(&lb));
    lb.status = json!({"loadBalancer": {"ingress": [{"ip": "203.0.113.7"}]}});
    assert!(is_ready(&lb));
}

#[test]
fn namespace_pod_and_passive_kinds() {
    let mut ns = ClusterObject::new("v1", "Namespace", "mesh-system");
    assert!(!is_ready(&ns));
    ns.status = json!({"phase": "Active"});
    assert!(is_ready(&ns));

    let mut pod = ClusterObject::new("v1", "Pod", "meshd-0");
    pod.status = json!({"conditions": [{"type": "Ready", "status": "False"}]});
    assert!(!is_ready(&pod));
    pod.status = json!({"conditions": [{"type": "Ready", "status": "True"}]});
    assert!(is_ready(&pod));

    assert!(is_ready(&ClusterObject::new("v1", "ConfigMap", "mesh")));
    assert!(is_ready(&ClusterObject::new("v1", "ServiceAccount", "meshd")));
}

#[tokio::test(start_paused = true)]
async fn ready_resources_return_immediately() {
    let cluster = MemoryCluster::new();
    cluster.seed(ClusterObject::new("v1", "ConfigMap", "mesh").in_namespace("mesh-system"));
    let resources = ResourceSet::new(vec![
        ClusterObject::new("v1", "ConfigMap", "mesh").in_namespace("mesh-system").key(),
    ]);

    let start = Instant::now();
    PollingWaiter::new(shared(&cluster))
        .wait_ready(&resources, Duration::from_secs(300), false)
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn never_ready_times_out_after_the_timeout() {
    let cluster = MemoryCluster::new();
    let object = deployment("meshd", 1);
    cluster.seed(object.clone());
    let resources = ResourceSet::new(vec![object.key()]);

    let start = Instant::now();
    let err = PollingWaiter::new(shared(&cluster))
        .wait_ready(&resources, Duration::from_secs(5), false)
        .await
        .unwrap_err();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(5), "gave up early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(7), "waited too long: {elapsed:?}");
    match err {
        InstallError::Timeout { timeout, unready } => {
            assert_eq!(timeout, Duration::from_secs(5));
            assert_eq!(unready, vec!["Deployment/mesh-system/meshd".to_string()]);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_checks_once() {
    let cluster = MemoryCluster::new();
    let resources = ResourceSet::new(vec![deployment("missing", 1).key()]);

    let start = Instant::now();
    let err = PollingWaiter::new(shared(&cluster))
        .wait_ready(&resources, Duration::ZERO, false)
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(matches!(err, InstallError::Timeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn becomes_ready_while_polling() {
    let cluster = MemoryCluster::new();
    let object = deployment("meshd", 1);
    cluster.seed(object.clone());
    let resources = ResourceSet::new(vec![object.key()]);

    let controller = cluster.clone();
    let key = object.key();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        controller.set_status(&key, json!({"readyReplicas": 1}));
    });

    let start = Instant::now();
    PollingWaiter::new(shared(&cluster))
        .wait_ready(&resources, Duration::from_secs(60), false)
        .await
        .unwrap();

    // Polls at 0s, 2s and 4s; the status flips at 3s.
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn dry_run_never_polls() {
    let cluster = MemoryCluster::new();
    let resources = ResourceSet::new(vec![deployment("missing", 1).key()]);

    PollingWaiter::new(shared(&cluster))
        .wait_ready(&resources, Duration::from_secs(5), true)
        .await
        .unwrap();
}

#[test]
fn resource_set_parses_manifest_text() {
    let text = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: mesh\n  namespace: mesh-system\n---\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: meshd\n  namespace: mesh-system\n";
    let set = ResourceSet::parse(text).unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set.keys()[1].to_string(), "Deployment/mesh-system/meshd");
}

#[tokio::test(start_paused = true)]
async fn timeout_beyond_the_clock_range_still_polls() {
    let cluster = MemoryCluster::new();
    let object = deployment("meshd", 1);
    cluster.seed(object.clone());
    let resources = ResourceSet::new(vec![object.key()]);

    let controller = cluster.clone();
    let key = object.key();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        controller.set_status(&key, json!({"readyReplicas": 1}));
    });

    let start = Instant::now();
    PollingWaiter::new(shared(&cluster))
        .with_interval(Duration::from_secs(1))
        .wait_ready(&resources, Duration::from_secs(u64::MAX), false)
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(3));
}
