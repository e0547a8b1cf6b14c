use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::client::{BoxFuture, ClusterClient};
use crate::error::ClusterError;
use crate::object::{admit, ClusterObject, ObjectKey};

/// A write observed by [`MemoryCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Created(ObjectKey),
    Patched(ObjectKey),
    Deleted(ObjectKey),
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<ObjectKey, ClusterObject>,
    journal: Vec<Mutation>,
}

/// In-process cluster. Clones share the same objects.
///
/// Every create, patch and delete goes into a journal so callers can assert
/// exactly which writes a run performed (or that it performed none).
#[derive(Clone, Default)]
pub struct MemoryCluster {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place an object directly, bypassing the journal.
    pub fn seed(&self, object: ClusterObject) {
        let object = admit(object);
        self.lock().objects.insert(object.key(), object);
    }

    /// Overwrite an object's status, as a controller would. Returns false if
    /// the object doesn't exist.
    pub fn set_status(&self, key: &ObjectKey, status: Value) -> bool {
        match self.lock().objects.get_mut(key) {
            Some(object) => {
                object.status = status;
                true
            }
            None => false,
        }
    }

    pub fn object(&self, key: &ObjectKey) -> Option<ClusterObject> {
        self.lock().objects.get(key).cloned()
    }

    pub fn objects(&self) -> Vec<ClusterObject> {
        self.lock().objects.values().cloned().collect()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }
}

impl ClusterClient for MemoryCluster {
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<ClusterObject>, ClusterError>> {
        Box::pin(async move { Ok(self.lock().objects.get(key).cloned()) })
    }

    fn list<'a>(
        &'a self,
        kind: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<ClusterObject>, ClusterError>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .objects
                .values()
                .filter(|o| o.kind == kind)
                .filter(|o| namespace.is_none() || o.metadata.namespace.as_deref() == namespace)
                .cloned()
                .collect())
        })
    }

    fn create<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            object.validate().map_err(ClusterError::InvalidObject)?;
            let key = object.key();
            let mut inner = self.lock();
            if inner.objects.contains_key(&key) {
                return Err(ClusterError::AlreadyExists { key });
            }
            let stored = admit(object.clone());
            inner.objects.insert(key.clone(), stored.clone());
            inner.journal.push(Mutation::Created(key));
            Ok(stored)
        })
    }

    fn patch<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            let key = object.key();
            let mut inner = self.lock();
            let live = inner
                .objects
                .remove(&key)
                .ok_or_else(|| ClusterError::NotFound { key: key.clone() })?;
            let patched = object.patched_onto(live);
            inner.objects.insert(key.clone(), patched.clone());
            inner.journal.push(Mutation::Patched(key));
            Ok(patched)
        })
    }

    fn delete<'a>(&'a self, key: &'a ObjectKey) -> BoxFuture<'a, Result<(), ClusterError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner
                .objects
                .remove(key)
                .ok_or_else(|| ClusterError::NotFound { key: key.clone() })?;
            inner.journal.push(Mutation::Deleted(key.clone()));
            Ok(())
        })
    }
}
