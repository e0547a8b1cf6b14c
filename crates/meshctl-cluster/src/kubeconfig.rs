//! Connection resolution: kubeconfig path + context → a cluster client.
//!
//! Only the subset of the kubeconfig format needed to pick a cluster is
//! read (`clusters`, `contexts`, `current-context`). The context's cluster
//! `server` selects the backend:
//!
//! | Server | Backend |
//! |--------|---------|
//! | `memory://` | fresh [`MemoryCluster`] |
//! | `file://<dir>` | [`LocalCluster`] rooted at `<dir>` |

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::client::ClusterClient;
use crate::error::ClusterError;
use crate::local::LocalCluster;
use crate::memory::MemoryCluster;

/// Where to find the cluster: kubeconfig path plus optional context name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

impl ConnectionDescriptor {
    /// Explicit path, else `$KUBECONFIG`, else `~/.kube/config`.
    pub fn kubeconfig_path(&self) -> Result<PathBuf, ClusterError> {
        if let Some(path) = &self.kubeconfig {
            return Ok(path.clone());
        }
        if let Some(env) = std::env::var_os("KUBECONFIG").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(env));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| ClusterError::Connection("no home directory for default kubeconfig".into()))?;
        Ok(home.join(".kube").join("config"))
    }
}

#[derive(Debug, Deserialize)]
struct KubeConfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default)]
    current_context: String,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    server: String,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
}

/// Resolve the descriptor to the server URL of its context.
pub fn resolve_server(descriptor: &ConnectionDescriptor) -> Result<String, ClusterError> {
    let path = descriptor.kubeconfig_path()?;
    let text = std::fs::read_to_string(&path).map_err(|e| {
        ClusterError::Connection(format!("failed to read kubeconfig {}: {e}", path.display()))
    })?;
    let config: KubeConfig = serde_yaml::from_str(&text).map_err(|e| {
        ClusterError::Connection(format!("invalid kubeconfig {}: {e}", path.display()))
    })?;

    let context_name = descriptor
        .context
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| config.current_context.clone());
    if context_name.is_empty() {
        return Err(ClusterError::Connection(format!(
            "no context given and {} has no current-context",
            path.display()
        )));
    }

    let context = config
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .ok_or_else(|| ClusterError::Connection(format!("context {context_name:?} not found")))?;
    let cluster = config
        .clusters
        .iter()
        .find(|c| c.name == context.context.cluster)
        .ok_or_else(|| {
            ClusterError::Connection(format!(
                "cluster {:?} (context {context_name:?}) not found",
                context.context.cluster
            ))
        })?;

    Ok(cluster.cluster.server.clone())
}

/// Build a client for the descriptor's cluster.
pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Arc<dyn ClusterClient>, ClusterError> {
    let server = resolve_server(descriptor)?;

    if server == "memory://" {
        tracing::info!("connected to in-memory cluster");
        return Ok(Arc::new(MemoryCluster::new()));
    }
    if let Some(dir) = server.strip_prefix("file://") {
        let cluster = LocalCluster::open(dir)
            .map_err(|e| ClusterError::Connection(format!("cannot open {dir}: {e}")))?;
        tracing::info!(root = %dir, "connected to local cluster");
        return Ok(Arc::new(cluster));
    }

    Err(ClusterError::Connection(format!(
        "unsupported cluster server {server:?} (expected memory:// or file://)"
    )))
}
