//! The installed-state record: the config of the last successful apply,
//! stored in the cluster as one `MeshInstall` object per revision.

use std::sync::Arc;

use meshctl_cluster::client::upsert;
use meshctl_cluster::{BoxFuture, ClusterClient, ClusterObject, ObjectKey};
use meshctl_core::revision::revision_label;
use meshctl_core::{installed_state_name, InstallSpec, ResolvedConfig};

use crate::error::InstallError;
use crate::render::REVISION_LABEL;

pub const RECORD_API_VERSION: &str = "install.meshctl.io/v1alpha1";
pub const RECORD_KIND: &str = "MeshInstall";
pub const RECORDED_AT_ANNOTATION: &str = "meshctl.io/recorded-at";

pub trait StateRecorder: Send + Sync {
    /// Upsert the record for `revision` and return its name. Under
    /// `dry_run` the record is built but not written.
    fn persist<'a>(
        &'a self,
        config: &'a ResolvedConfig,
        revision: &'a str,
        dry_run: bool,
    ) -> BoxFuture<'a, Result<String, InstallError>>;
}

/// Build the record object for `config`.
pub fn record_object(config: &ResolvedConfig, revision: &str) -> Result<ClusterObject, InstallError> {
    let name = installed_state_name(revision);
    let spec = config.to_json().map_err(|e| InstallError::Persistence {
        record: name.clone(),
        reason: e.to_string(),
    })?;

    let mut object = ClusterObject::new(RECORD_API_VERSION, RECORD_KIND, &name)
        .in_namespace(config.namespace())
        .with_label(REVISION_LABEL, revision_label(revision))
        .with_spec(spec);
    object.metadata.annotations.insert(
        RECORDED_AT_ANNOTATION.to_string(),
        jiff::Timestamp::now().to_string(),
    );
    Ok(object)
}

pub struct ClusterStateRecorder {
    client: Arc<dyn ClusterClient>,
}

impl ClusterStateRecorder {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }
}

impl StateRecorder for ClusterStateRecorder {
    fn persist<'a>(
        &'a self,
        config: &'a ResolvedConfig,
        revision: &'a str,
        dry_run: bool,
    ) -> BoxFuture<'a, Result<String, InstallError>> {
        Box::pin(async move {
            let object = record_object(config, revision)?;
            let name = object.name().to_string();

            if dry_run {
                tracing::info!(record = %name, "installed state not written (dry run)");
                return Ok(name);
            }

            upsert(self.client.as_ref(), &object)
                .await
                .map_err(|e| InstallError::Persistence {
                    record: name.clone(),
                    reason: e.to_string(),
                })?;
            tracing::info!(record = %name, namespace = %config.namespace(), "installed state recorded");
            Ok(name)
        })
    }
}

/// Read back the config recorded for `revision` in `namespace`.
pub async fn load_installed_state(
    client: &dyn ClusterClient,
    namespace: &str,
    revision: &str,
) -> Result<Option<ResolvedConfig>, InstallError> {
    let name = installed_state_name(revision);
    let key = ObjectKey {
        kind: RECORD_KIND.into(),
        namespace: Some(namespace.to_string()),
        name: name.clone(),
    };
    let fail = |reason: String| InstallError::Persistence {
        record: name.clone(),
        reason,
    };

    let Some(object) = client.get(&key).await.map_err(|e| fail(e.to_string()))? else {
        return Ok(None);
    };
    decode_record(object).map(Some).map_err(|e| fail(e.to_string()))
}

/// Every installed-state record in the cluster, across namespaces and
/// revisions, keyed by record.
pub async fn list_installed_states(
    client: &dyn ClusterClient,
) -> Result<Vec<(ObjectKey, ResolvedConfig)>, InstallError> {
    let records = client
        .list(RECORD_KIND, None)
        .await
        .map_err(|e| InstallError::Persistence {
            record: RECORD_KIND.to_string(),
            reason: e.to_string(),
        })?;

    records
        .into_iter()
        .map(|object| {
            let key = object.key();
            decode_record(object)
                .map(|config| (key.clone(), config))
                .map_err(|e| InstallError::Persistence {
                    record: key.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn decode_record(object: ClusterObject) -> Result<ResolvedConfig, serde_json::Error> {
    let spec: InstallSpec = serde_json::from_value(object.spec)?;
    Ok(ResolvedConfig::new(spec))
}
