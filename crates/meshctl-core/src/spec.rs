use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_NAMESPACE: &str = "mesh-system";
pub const DEFAULT_PROFILE: &str = "default";

/// Components the renderer knows how to materialize, in install order.
pub const KNOWN_COMPONENTS: &[&str] = &["base", "pilot", "cni", "ingressGateways", "egressGateways"];

/// Optional addons toggled through `values.<addon>.enabled`.
pub const KNOWN_ADDONS: &[&str] = &["grafana", "prometheus", "tracing", "kiali"];

/// Top-level fields accepted in a spec document or overlay root.
pub const SPEC_FIELDS: &[&str] = &[
    "profile",
    "revision",
    "namespace",
    "hub",
    "tag",
    "installPackagePath",
    "meshConfig",
    "components",
    "values",
];

/// Top-level fields that always hold text, even when the text looks like a
/// number (`revision=1`, `tag=1.10`).
pub const STRING_FIELDS: &[&str] = &["profile", "revision", "namespace", "hub", "tag", "installPackagePath"];

/// The merged install configuration.
///
/// Input files, `--set` overlays and the persisted installed-state record
/// all share this camelCase shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSpec {
    #[serde(default)]
    pub profile: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub hub: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_package_path: String,
    #[serde(default)]
    pub mesh_config: Map<String, Value>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSpec>,
    #[serde(default)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Overrides the install namespace for this component only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl InstallSpec {
    pub fn effective_namespace(&self) -> &str {
        if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }

    pub fn component_enabled(&self, name: &str) -> bool {
        self.components.get(name).is_some_and(|c| c.enabled)
    }

    pub fn addon_enabled(&self, addon: &str) -> bool {
        self.values
            .get(addon)
            .and_then(|v| v.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
