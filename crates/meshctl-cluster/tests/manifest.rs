use meshctl_cluster::{ClusterError, ClusterObject, Manifest};
use serde_json::json;

const TWO_OBJECTS: &str = r#"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: pilot
  namespace: mesh-system
---
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: pilot
  namespace: mesh-system
  labels:
    app: pilot
spec:
  replicas: 2
"#;

#[test]
fn parses_documents_and_skips_empty_ones() {
    let manifest = Manifest::parse_yaml(TWO_OBJECTS).unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.kinds(), vec!["ServiceAccount", "Deployment"]);

    let deploy = &manifest.objects()[1];
    assert_eq!(deploy.label("app"), Some("pilot"));
    assert_eq!(deploy.spec, json!({"replicas": 2}));
    assert_eq!(deploy.key().to_string(), "Deployment/mesh-system/pilot");
}

#[test]
fn emitted_yaml_parses_back() {
    let manifest = Manifest::new(vec![
        ClusterObject::new("v1", "Namespace", "mesh-system"),
        ClusterObject::new("v1", "ConfigMap", "mesh")
            .in_namespace("mesh-system")
            .with_data(json!({"mesh": "trustDomain: cluster.local"})),
    ]);

    let yaml = manifest.to_yaml().unwrap();
    assert!(yaml.contains("---\n"));
    assert_eq!(Manifest::parse_yaml(&yaml).unwrap(), manifest);
}

#[test]
fn rejects_document_without_name() {
    let err = Manifest::parse_yaml("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: \"\"\n")
        .unwrap_err();
    assert!(matches!(err, ClusterError::InvalidObject(_)));

    assert!(Manifest::parse_yaml("apiVersion: v1\nmetadata:\n  name: x\n").is_err());
}
