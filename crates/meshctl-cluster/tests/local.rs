use meshctl_cluster::{ClusterClient, ClusterError, ClusterObject, LocalCluster};
use serde_json::json;

#[tokio::test]
async fn objects_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = ClusterObject::new("apps/v1", "Deployment", "pilot")
        .in_namespace("mesh-system")
        .with_spec(json!({"replicas": 1}));

    {
        let cluster = LocalCluster::open(dir.path()).unwrap();
        cluster.create(&deploy).await.unwrap();
    }

    let reopened = LocalCluster::open(dir.path()).unwrap();
    let fetched = reopened.get(&deploy.key()).await.unwrap().unwrap();
    assert_eq!(fetched, deploy);
    assert!(dir
        .path()
        .join("mesh-system/deployment/pilot.json")
        .exists());
}

#[tokio::test]
async fn cluster_scoped_objects_use_cluster_dir() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = LocalCluster::open(dir.path().join("state")).unwrap();
    assert_eq!(cluster.root(), dir.path().join("state"));
    cluster
        .create(&ClusterObject::new("v1", "Namespace", "mesh-system"))
        .await
        .unwrap();

    assert!(cluster.root().join("_cluster/namespace/mesh-system.json").exists());
    let all = cluster.list("Namespace", None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status["phase"], "Active");
}

#[tokio::test]
async fn delete_and_missing_errors() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = LocalCluster::open(dir.path()).unwrap();
    let cm = ClusterObject::new("v1", "ConfigMap", "mesh").in_namespace("mesh-system");

    assert!(matches!(
        cluster.patch(&cm).await.unwrap_err(),
        ClusterError::NotFound { .. }
    ));
    cluster.create(&cm).await.unwrap();
    assert!(matches!(
        cluster.create(&cm).await.unwrap_err(),
        ClusterError::AlreadyExists { .. }
    ));
    cluster.delete(&cm.key()).await.unwrap();
    assert!(cluster.get(&cm.key()).await.unwrap().is_none());
    assert!(cluster
        .list("ConfigMap", Some("mesh-system"))
        .await
        .unwrap()
        .is_empty());
}
