use std::sync::Arc;

use meshctl_cluster::{BoxFuture, ClusterClient, ClusterError, ClusterObject, ObjectKey};

use crate::error::InstallError;

/// Makes sure the install namespace exists before anything is applied into it.
pub trait NamespacePreparer: Send + Sync {
    /// Idempotent: an existing namespace is success. Under `dry_run` the
    /// namespace is only looked up, never created.
    fn ensure<'a>(&'a self, namespace: &'a str, dry_run: bool)
    -> BoxFuture<'a, Result<(), InstallError>>;
}

pub struct ClusterNamespaces {
    client: Arc<dyn ClusterClient>,
}

impl ClusterNamespaces {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }
}

pub fn namespace_object(name: &str) -> ClusterObject {
    ClusterObject::new("v1", "Namespace", name)
}

impl NamespacePreparer for ClusterNamespaces {
    fn ensure<'a>(
        &'a self,
        namespace: &'a str,
        dry_run: bool,
    ) -> BoxFuture<'a, Result<(), InstallError>> {
        Box::pin(async move {
            let fail = |e: ClusterError| InstallError::Namespace {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            };

            let key = ObjectKey {
                kind: "Namespace".into(),
                namespace: None,
                name: namespace.to_string(),
            };
            if self.client.get(&key).await.map_err(fail)?.is_some() {
                tracing::debug!(namespace = %namespace, "namespace already exists");
                return Ok(());
            }

            if dry_run {
                tracing::info!(namespace = %namespace, "namespace would be created (dry run)");
                return Ok(());
            }

            match self.client.create(&namespace_object(namespace)).await {
                Ok(_) => {
                    tracing::info!(namespace = %namespace, "namespace created");
                    Ok(())
                }
                // Someone else created it between our get and create.
                Err(ClusterError::AlreadyExists { .. }) => Ok(()),
                Err(e) => Err(fail(e)),
            }
        })
    }
}
