use meshctl_cluster::client::upsert;
use meshctl_cluster::{ClusterClient, ClusterError, ClusterObject, MemoryCluster, Mutation};
use serde_json::json;

fn config_map(name: &str, data: serde_json::Value) -> ClusterObject {
    ClusterObject::new("v1", "ConfigMap", name)
        .in_namespace("mesh-system")
        .with_data(data)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let cluster = MemoryCluster::new();
    let cm = config_map("mesh", json!({"a": "1"}));

    cluster.create(&cm).await.unwrap();
    let fetched = cluster.get(&cm.key()).await.unwrap().unwrap();

    assert_eq!(fetched, cm);
    assert_eq!(cluster.mutations(), vec![Mutation::Created(cm.key())]);
}

#[tokio::test]
async fn create_twice_is_already_exists() {
    let cluster = MemoryCluster::new();
    let cm = config_map("mesh", json!({}));
    cluster.create(&cm).await.unwrap();

    let err = cluster.create(&cm).await.unwrap_err();
    assert!(matches!(err, ClusterError::AlreadyExists { .. }));
}

#[tokio::test]
async fn patch_missing_object_is_not_found() {
    let cluster = MemoryCluster::new();
    let err = cluster.patch(&config_map("mesh", json!({}))).await.unwrap_err();
    assert!(matches!(err, ClusterError::NotFound { .. }));
    assert!(cluster.mutations().is_empty());
}

#[tokio::test]
async fn patch_keeps_status_and_cluster_assigned_fields() {
    let cluster = MemoryCluster::new();
    let svc = ClusterObject::new("v1", "Service", "pilot")
        .in_namespace("mesh-system")
        .with_spec(json!({"ports": [{"port": 15010}]}));
    let created = cluster.create(&svc).await.unwrap();
    let ip = created.spec["clusterIP"].clone();
    assert!(ip.is_string());

    let changed = svc.clone().with_spec(json!({"ports": [{"port": 15012}]}));
    let patched = cluster.patch(&changed).await.unwrap();

    assert_eq!(patched.spec["clusterIP"], ip);
    assert_eq!(patched.spec["ports"], json!([{"port": 15012}]));
    assert!(changed.is_satisfied_by(&patched));
}

#[tokio::test]
async fn namespaces_are_active_on_create() {
    let cluster = MemoryCluster::new();
    let ns = ClusterObject::new("v1", "Namespace", "mesh-system");
    let created = cluster.create(&ns).await.unwrap();
    assert_eq!(created.status, json!({"phase": "Active"}));
}

#[tokio::test]
async fn upsert_overwrites_instead_of_merging() {
    let cluster = MemoryCluster::new();
    upsert(&cluster, &config_map("state", json!({"a": "1", "b": "2"})))
        .await
        .unwrap();
    upsert(&cluster, &config_map("state", json!({"a": "3"})))
        .await
        .unwrap();

    let live = cluster
        .get(&config_map("state", json!({})).key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.data, json!({"a": "3"}));
    assert_eq!(cluster.objects().len(), 1);
}

#[tokio::test]
async fn list_filters_by_kind_and_namespace() {
    let cluster = MemoryCluster::new();
    cluster.seed(config_map("one", json!({})));
    cluster.seed(config_map("two", json!({})).in_namespace("other"));
    cluster.seed(ClusterObject::new("v1", "Namespace", "other"));

    assert_eq!(cluster.list("ConfigMap", None).await.unwrap().len(), 2);
    assert_eq!(
        cluster
            .list("ConfigMap", Some("mesh-system"))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(cluster.mutations().is_empty());
}

#[tokio::test]
async fn set_status_simulates_controller() {
    let cluster = MemoryCluster::new();
    let deploy = ClusterObject::new("apps/v1", "Deployment", "pilot").in_namespace("mesh-system");
    cluster.seed(deploy.clone());

    assert!(cluster.set_status(&deploy.key(), json!({"readyReplicas": 1})));
    assert_eq!(
        cluster.object(&deploy.key()).unwrap().status,
        json!({"readyReplicas": 1})
    );
    assert!(!cluster.set_status(
        &ClusterObject::new("apps/v1", "Deployment", "missing").key(),
        json!({})
    ));
}
