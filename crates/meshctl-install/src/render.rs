//! Renders the desired cluster objects for a resolved config.
//!
//! Output order is install order: base, control plane, node agent, gateways,
//! then addons. Within one component the ServiceAccount comes before the
//! workload, and the workload before its Service.

use meshctl_cluster::{ClusterObject, Manifest};
use meshctl_core::revision::revision_label;
use meshctl_core::ResolvedConfig;
use serde_json::{json, Map, Value};

use crate::error::InstallError;

pub const REVISION_LABEL: &str = "meshctl.io/rev";
pub const OWNED_BY_LABEL: &str = "meshctl.io/owned-by";
/// Owner and revision label of addons, which every revision shares.
pub const SHARED_OWNER: &str = "shared";
const APP_LABEL: &str = "app";

/// Every kind `render` can emit. Pruning looks at exactly these.
pub const RENDERED_KINDS: &[&str] = &["ServiceAccount", "ConfigMap", "Deployment", "DaemonSet", "Service"];

struct Workload {
    name: &'static str,
    image: &'static str,
    ports: &'static [u16],
    service_type: &'static str,
}

const PILOT: Workload = Workload {
    name: "meshd",
    image: "pilot",
    ports: &[15010, 15012, 443],
    service_type: "ClusterIP",
};

const INGRESS: Workload = Workload {
    name: "mesh-ingressgateway",
    image: "proxyv2",
    ports: &[80, 443, 15021],
    service_type: "LoadBalancer",
};

const EGRESS: Workload = Workload {
    name: "mesh-egressgateway",
    image: "proxyv2",
    ports: &[80, 443],
    service_type: "ClusterIP",
};

const ADDONS: &[(&str, Workload)] = &[
    ("grafana", Workload { name: "grafana", image: "grafana", ports: &[3000], service_type: "ClusterIP" }),
    ("prometheus", Workload { name: "prometheus", image: "prometheus", ports: &[9090], service_type: "ClusterIP" }),
    ("tracing", Workload { name: "tracing", image: "jaeger", ports: &[16686, 9411], service_type: "ClusterIP" }),
    ("kiali", Workload { name: "kiali", image: "kiali", ports: &[20001], service_type: "ClusterIP" }),
];

/// Shared naming and labelling for one render pass.
struct Context<'a> {
    config: &'a ResolvedConfig,
    revision: &'a str,
    rev_label: &'a str,
    owner: String,
}

impl Context<'_> {
    /// Control-plane names carry the revision so revisions can coexist.
    fn revisioned(&self, base: &str) -> String {
        if self.revision.is_empty() {
            base.to_string()
        } else {
            format!("{base}-{}", self.revision)
        }
    }

    fn image(&self, image: &str) -> String {
        let spec = self.config.spec();
        if spec.hub.is_empty() {
            format!("{image}:{}", spec.tag)
        } else {
            format!("{}/{image}:{}", spec.hub.trim_end_matches('/'), spec.tag)
        }
    }

    fn namespace_for(&self, component: &str) -> &str {
        self.config
            .spec()
            .components
            .get(component)
            .and_then(|c| c.namespace.as_deref())
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| self.config.namespace())
    }

    fn object(&self, api_version: &str, kind: &str, name: &str, namespace: &str, app: &str) -> ClusterObject {
        ClusterObject::new(api_version, kind, name)
            .in_namespace(namespace)
            .with_label(APP_LABEL, app)
            .with_label(REVISION_LABEL, self.rev_label)
            .with_label(OWNED_BY_LABEL, &self.owner)
    }

    fn values_for(&self, key: &str) -> Option<&Map<String, Value>> {
        self.config.spec().values.get(key).and_then(Value::as_object)
    }

    fn container(&self, name: &str, image: &str, ports: &[u16], values_key: &str) -> Value {
        let mut container = json!({
            "name": name,
            "image": self.image(image),
            "ports": ports.iter().map(|p| json!({"containerPort": p})).collect::<Vec<_>>(),
        });
        if let Some(resources) = self.values_for(values_key).and_then(|v| v.get("resources")) {
            container["resources"] = resources.clone();
        }
        if let Some(env) = self.values_for(values_key).and_then(|v| v.get("env")).and_then(Value::as_object) {
            let env: Vec<Value> = env
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => json!({"name": k, "value": s}),
                    other => json!({"name": k, "value": other.to_string()}),
                })
                .collect();
            container["env"] = Value::Array(env);
        }
        container
    }

    fn workload(
        &self,
        out: &mut Vec<ClusterObject>,
        workload: &Workload,
        name: &str,
        namespace: &str,
        replicas: u32,
        key: &str,
    ) {
        let selector = json!({ APP_LABEL: name });

        out.push(self.object("v1", "ServiceAccount", name, namespace, name));
        out.push(self.object("apps/v1", "Deployment", name, namespace, name).with_spec(json!({
            "replicas": replicas,
            "selector": { "matchLabels": selector },
            "strategy": {
                "type": "RollingUpdate",
                "rollingUpdate": { "maxSurge": "100%", "maxUnavailable": "25%" },
            },
            "template": {
                "metadata": { "labels": { APP_LABEL: name, REVISION_LABEL: self.rev_label } },
                "spec": {
                    "serviceAccountName": name,
                    "containers": [self.container(workload.name, workload.image, workload.ports, key)],
                },
            },
        })));
        out.push(self.object("v1", "Service", name, namespace, name).with_spec(json!({
            "type": workload.service_type,
            "selector": selector,
            "ports": workload
                .ports
                .iter()
                .map(|p| json!({"name": format!("port-{p}"), "port": p, "targetPort": p}))
                .collect::<Vec<_>>(),
        })));
    }
}

/// The addon a shared object belongs to, from its `app` label.
pub fn addon_of(object: &ClusterObject) -> Option<&'static str> {
    let app = object.label(APP_LABEL)?;
    ADDONS
        .iter()
        .find(|(_, workload)| workload.name == app)
        .map(|(addon, _)| *addon)
}

/// Build the manifest for `config`. Deterministic for a given config.
pub fn render(config: &ResolvedConfig) -> Result<Manifest, InstallError> {
    let spec = config.spec();
    let cx = Context {
        config,
        revision: config.revision(),
        rev_label: revision_label(config.revision()),
        owner: config.record_name(),
    };

    let anything_enabled = spec.components.values().any(|c| c.enabled)
        || ADDONS.iter().any(|(addon, _)| spec.addon_enabled(addon));
    if anything_enabled && spec.tag.is_empty() {
        return Err(InstallError::Manifest("no image tag set (spec.tag)".into()));
    }

    let mut objects = Vec::new();
    let replicas = |component: &str| {
        spec.components
            .get(component)
            .and_then(|c| c.replicas)
            .unwrap_or(1)
    };

    if spec.component_enabled("base") {
        let namespace = cx.namespace_for("base");
        let name = cx.revisioned("meshctl-reader");
        objects.push(cx.object("v1", "ServiceAccount", &name, namespace, &name));

        let mesh = serde_json::to_string_pretty(&spec.mesh_config)
            .map_err(|e| InstallError::Manifest(e.to_string()))?;
        let config_name = cx.revisioned("mesh");
        objects.push(
            cx.object("v1", "ConfigMap", &config_name, namespace, &config_name)
                .with_data(json!({ "mesh": mesh })),
        );
    }

    if spec.component_enabled("pilot") {
        let name = cx.revisioned(PILOT.name);
        cx.workload(&mut objects, &PILOT, &name, cx.namespace_for("pilot"), replicas("pilot"), "pilot");
    }

    if spec.component_enabled("cni") {
        let namespace = cx.namespace_for("cni");
        let name = cx.revisioned("mesh-cni");
        objects.push(cx.object("v1", "ServiceAccount", &name, namespace, &name));
        objects.push(cx.object("apps/v1", "DaemonSet", &format!("{name}-node"), namespace, &name).with_spec(json!({
            "selector": { "matchLabels": { APP_LABEL: name } },
            "template": {
                "metadata": { "labels": { APP_LABEL: name } },
                "spec": {
                    "serviceAccountName": name,
                    "containers": [cx.container("install-cni", "install-cni", &[], "cni")],
                },
            },
        })));
    }

    if spec.component_enabled("ingressGateways") {
        let name = cx.revisioned(INGRESS.name);
        let namespace = cx.namespace_for("ingressGateways");
        cx.workload(&mut objects, &INGRESS, &name, namespace, replicas("ingressGateways"), "gateways");
    }
    if spec.component_enabled("egressGateways") {
        let name = cx.revisioned(EGRESS.name);
        let namespace = cx.namespace_for("egressGateways");
        cx.workload(&mut objects, &EGRESS, &name, namespace, replicas("egressGateways"), "gateways");
    }

    // Addons are shared across revisions: unsuffixed names and the same
    // labels whichever revision renders them.
    let shared = Context {
        config,
        revision: "",
        rev_label: SHARED_OWNER,
        owner: SHARED_OWNER.to_string(),
    };
    for (addon, workload) in ADDONS {
        if !spec.addon_enabled(addon) {
            continue;
        }
        shared.workload(&mut objects, workload, workload.name, config.namespace(), 1, addon);
    }

    tracing::debug!(objects = objects.len(), "manifest rendered");
    Ok(Manifest::new(objects))
}
