use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Composite key for addressing an object in the cluster.
///
/// Cluster-scoped kinds (e.g. `Namespace`) have no namespace.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A single cluster resource as it appears in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    /// ConfigMap-style payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub status: Value,
}

impl ClusterObject {
    pub fn new(api_version: &str, kind: &str, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                ..Default::default()
            },
            spec: Value::Null,
            data: Value::Null,
            status: Value::Null,
        }
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.metadata.namespace = Some(namespace.to_string());
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind.clone(),
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    /// True when every field this object sets is already present, with the
    /// same value, on `live`. Fields the cluster adds (status, assigned IPs)
    /// do not count as drift.
    pub fn is_satisfied_by(&self, live: &ClusterObject) -> bool {
        self.api_version == live.api_version
            && is_subset(&self.spec, &live.spec)
            && is_subset(&self.data, &live.data)
            && self
                .metadata
                .labels
                .iter()
                .all(|(k, v)| live.metadata.labels.get(k) == Some(v))
            && self
                .metadata
                .annotations
                .iter()
                .all(|(k, v)| live.metadata.annotations.get(k) == Some(v))
    }

    /// Apply this object's desired state onto `live` as a JSON merge patch.
    /// Status is kept.
    pub fn patched_onto(&self, mut live: ClusterObject) -> ClusterObject {
        live.api_version = self.api_version.clone();
        merge_patch(&mut live.spec, &self.spec);
        merge_patch(&mut live.data, &self.data);
        live.metadata
            .labels
            .extend(self.metadata.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        live.metadata
            .annotations
            .extend(self.metadata.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        live
    }

    /// Patch that turns `live` into exactly this object's spec and data:
    /// keys present on `live` but absent here are sent as `null`.
    pub fn replacement_patch(&self, live: &ClusterObject) -> ClusterObject {
        let mut patch = self.clone();
        patch.spec = with_tombstones(&self.spec, &live.spec);
        patch.data = with_tombstones(&self.data, &live.data);
        patch
    }

    /// Stable hash of the desired state, used to skip re-applying an object
    /// within one run.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.api_version.hash(&mut hasher);
        self.key().hash(&mut hasher);
        self.spec.to_string().hash(&mut hasher);
        self.data.to_string().hash(&mut hasher);
        self.metadata.labels.hash(&mut hasher);
        self.metadata.annotations.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.kind.is_empty() {
            return Err("missing kind".into());
        }
        if self.metadata.name.is_empty() {
            return Err(format!("{} is missing metadata.name", self.kind));
        }
        Ok(())
    }
}

fn is_subset(desired: &Value, live: &Value) -> bool {
    match (desired, live) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want
            .iter()
            .all(|(k, v)| have.get(k).is_some_and(|h| is_subset(v, h)) || v.is_null()),
        (want, have) => want == have,
    }
}

fn with_tombstones(desired: &Value, live: &Value) -> Value {
    match (desired, live) {
        (Value::Object(want), Value::Object(have)) => {
            let mut out = serde_json::Map::new();
            for (key, value) in want {
                let merged = match have.get(key) {
                    Some(live_value) => with_tombstones(value, live_value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            for key in have.keys().filter(|k| !want.contains_key(*k)) {
                out.insert(key.clone(), Value::Null);
            }
            Value::Object(out)
        }
        (Value::Null, Value::Object(have)) => {
            Value::Object(have.keys().map(|k| (k.clone(), Value::Null)).collect())
        }
        _ => desired.clone(),
    }
}

/// RFC 7386 merge patch: maps merge, `null` removes a key, anything else
/// replaces.
fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Null => {}
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(target_map) = target {
                for (key, value) in patch_map {
                    if value.is_null() {
                        target_map.remove(key);
                    } else {
                        merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

/// Defaults an API server fills in on create: namespaces become `Active`,
/// services get a cluster IP.
pub(crate) fn admit(mut object: ClusterObject) -> ClusterObject {
    match object.kind.as_str() {
        "Namespace" if object.status.get("phase").is_none() => {
            object.status = json!({"phase": "Active"});
        }
        "Service" => {
            let is_external = object.spec.get("type").and_then(Value::as_str) == Some("ExternalName");
            let has_ip = object.spec.get("clusterIP").is_some();
            if !is_external && !has_ip {
                if let Value::Object(spec) = &mut object.spec {
                    spec.insert("clusterIP".into(), Value::String(cluster_ip_for(&object.metadata)));
                } else if object.spec.is_null() {
                    object.spec = json!({"clusterIP": cluster_ip_for(&object.metadata)});
                }
            }
        }
        _ => {}
    }
    object
}

fn cluster_ip_for(meta: &ObjectMeta) -> String {
    let mut hasher = DefaultHasher::new();
    meta.namespace.hash(&mut hasher);
    meta.name.hash(&mut hasher);
    let h = hasher.finish();
    format!("10.96.{}.{}", (h >> 8) % 256, (h % 254) + 1)
}
