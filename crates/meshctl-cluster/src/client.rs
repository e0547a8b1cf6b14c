use std::future::Future;
use std::pin::Pin;

use crate::error::ClusterError;
use crate::object::{ClusterObject, ObjectKey};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Typed access to cluster objects.
///
/// One impl per backend. Methods return boxed futures for dyn
/// compatibility, so the install pipeline can hold an
/// `Arc<dyn ClusterClient>` and tests can swap in fault-injecting fakes.
pub trait ClusterClient: Send + Sync {
    /// Fetch one object. `None` = doesn't exist.
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<ClusterObject>, ClusterError>>;

    /// All objects of `kind`, optionally restricted to one namespace.
    fn list<'a>(
        &'a self,
        kind: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<ClusterObject>, ClusterError>>;

    /// Create a new object. Fails with `AlreadyExists` if the key is taken.
    fn create<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>>;

    /// Merge-patch an existing object's desired state. Fails with `NotFound`.
    fn patch<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>>;

    /// Remove an object. Fails with `NotFound`.
    fn delete<'a>(&'a self, key: &'a ObjectKey) -> BoxFuture<'a, Result<(), ClusterError>>;
}

/// Create-or-overwrite keyed by the object's identity.
///
/// An existing object ends up with exactly `object`'s spec and data, not a
/// merge of old and new. Concurrent writers are not coordinated here; losing
/// a create race against another writer falls through to an overwrite.
pub async fn upsert(
    client: &dyn ClusterClient,
    object: &ClusterObject,
) -> Result<ClusterObject, ClusterError> {
    let key = object.key();
    if let Some(live) = client.get(&key).await? {
        return client.patch(&object.replacement_patch(&live)).await;
    }
    match client.create(object).await {
        Err(ClusterError::AlreadyExists { .. }) => {
            let live = client
                .get(&key)
                .await?
                .ok_or(ClusterError::NotFound { key: key.clone() })?;
            client.patch(&object.replacement_patch(&live)).await
        }
        other => other,
    }
}
