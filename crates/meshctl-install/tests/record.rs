mod common;

use meshctl_cluster::{ClusterClient, MemoryCluster};
use meshctl_install::record::{record_object, RECORDED_AT_ANNOTATION, RECORD_KIND};
use meshctl_install::{load_installed_state, ClusterStateRecorder, InstallError, StateRecorder};

use common::{config, shared, FailingWrites};

async fn records(cluster: &MemoryCluster) -> Vec<String> {
    cluster
        .list(RECORD_KIND, None)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.name().to_string())
        .collect()
}

#[test]
fn record_carries_config_and_timestamp() {
    let config = config(&["revision=canary"]);
    let object = record_object(&config, config.revision()).unwrap();

    assert_eq!(object.name(), "installed-state-canary");
    assert_eq!(object.metadata.namespace.as_deref(), Some("mesh-system"));
    assert_eq!(object.spec, config.to_json().unwrap());
    assert!(object.metadata.annotations.contains_key(RECORDED_AT_ANNOTATION));
}

#[tokio::test]
async fn repeated_persist_keeps_one_record_with_latest_config() {
    let cluster = MemoryCluster::new();
    let recorder = ClusterStateRecorder::new(shared(&cluster));

    for tag in ["1.0.0", "1.1.0", "1.2.0"] {
        let tag = format!("tag={tag}");
        let config = config(&["revision=canary", tag.as_str()]);
        let name = recorder.persist(&config, config.revision(), false).await.unwrap();
        assert_eq!(name, "installed-state-canary");
    }

    assert_eq!(records(&cluster).await, vec!["installed-state-canary".to_string()]);
    let stored = load_installed_state(&cluster, "mesh-system", "canary")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.spec().tag, "1.2.0");
}

#[tokio::test]
async fn overwrite_drops_fields_from_the_previous_record() {
    let cluster = MemoryCluster::new();
    let recorder = ClusterStateRecorder::new(shared(&cluster));

    let first = config(&["values.grafana.dashboards.mesh=true"]);
    recorder.persist(&first, "", false).await.unwrap();
    let second = config(&[]);
    recorder.persist(&second, "", false).await.unwrap();

    let stored = load_installed_state(&cluster, "mesh-system", "").await.unwrap().unwrap();
    assert_eq!(stored, second);
}

#[tokio::test]
async fn revisions_get_separate_records() {
    let cluster = MemoryCluster::new();
    let recorder = ClusterStateRecorder::new(shared(&cluster));

    let default = config(&[]);
    let canary = config(&["revision=canary"]);
    recorder.persist(&default, default.revision(), false).await.unwrap();
    recorder.persist(&canary, canary.revision(), false).await.unwrap();
    recorder.persist(&default, default.revision(), false).await.unwrap();

    let mut names = records(&cluster).await;
    names.sort();
    assert_eq!(names, vec!["installed-state", "installed-state-canary"]);
}

#[tokio::test]
async fn dry_run_names_the_record_without_writing() {
    let cluster = MemoryCluster::new();
    let recorder = ClusterStateRecorder::new(shared(&cluster));
    let config = config(&[]);

    let name = recorder.persist(&config, "", true).await.unwrap();

    assert_eq!(name, "installed-state");
    assert!(cluster.mutations().is_empty());
}

#[tokio::test]
async fn write_failure_is_a_persistence_error() {
    let failing = std::sync::Arc::new(FailingWrites::new(RECORD_KIND));
    let recorder = ClusterStateRecorder::new(failing.clone());
    let config = config(&[]);

    let err = recorder.persist(&config, "", false).await.unwrap_err();

    assert!(matches!(err, InstallError::Persistence { ref record, .. } if record == "installed-state"));
    assert!(failing.inner.mutations().is_empty());
}

#[tokio::test]
async fn missing_record_loads_as_none() {
    let cluster = MemoryCluster::new();
    assert!(load_installed_state(&cluster, "mesh-system", "").await.unwrap().is_none());
}
