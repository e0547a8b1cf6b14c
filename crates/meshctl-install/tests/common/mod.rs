#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meshctl_cluster::{BoxFuture, ClusterClient, ClusterError, ClusterObject, MemoryCluster, ObjectKey};
use meshctl_core::{OverlayList, ResolvedConfig};
use meshctl_install::{ConfigResolver, InstallError, StateRecorder};

pub fn config(sets: &[&str]) -> ResolvedConfig {
    ConfigResolver::new()
        .resolve(&[], &OverlayList::parse_all(sets).unwrap(), false)
        .unwrap()
        .config
}

/// Memory cluster that rejects writes of one kind.
pub struct FailingWrites {
    pub inner: MemoryCluster,
    pub kind: &'static str,
}

impl FailingWrites {
    pub fn new(kind: &'static str) -> Self {
        Self {
            inner: MemoryCluster::new(),
            kind,
        }
    }

    fn reject(&self, object: &ClusterObject) -> Result<(), ClusterError> {
        if object.kind == self.kind {
            return Err(ClusterError::Request {
                key: object.key(),
                reason: "admission webhook denied the request".into(),
            });
        }
        Ok(())
    }
}

impl ClusterClient for FailingWrites {
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<ClusterObject>, ClusterError>> {
        self.inner.get(key)
    }

    fn list<'a>(
        &'a self,
        kind: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<ClusterObject>, ClusterError>> {
        self.inner.list(kind, namespace)
    }

    fn create<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            self.reject(object)?;
            self.inner.create(object).await
        })
    }

    fn patch<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            self.reject(object)?;
            self.inner.patch(object).await
        })
    }

    fn delete<'a>(&'a self, key: &'a ObjectKey) -> BoxFuture<'a, Result<(), ClusterError>> {
        self.inner.delete(key)
    }
}

/// Recorder that only counts calls.
#[derive(Clone, Default)]
pub struct CountingRecorder {
    pub calls: Arc<AtomicUsize>,
}

impl CountingRecorder {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StateRecorder for CountingRecorder {
    fn persist<'a>(
        &'a self,
        config: &'a ResolvedConfig,
        _revision: &'a str,
        _dry_run: bool,
    ) -> BoxFuture<'a, Result<String, InstallError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(config.record_name())
        })
    }
}

pub fn shared(cluster: &MemoryCluster) -> Arc<dyn ClusterClient> {
    Arc::new(cluster.clone())
}

/// Memory cluster whose reads lag behind: every `get` reports the object
/// missing, or fails outright when `unreachable`.
pub struct StaleReads {
    pub inner: MemoryCluster,
    pub unreachable: bool,
}

impl ClusterClient for StaleReads {
    fn get<'a>(
        &'a self,
        _key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<ClusterObject>, ClusterError>> {
        Box::pin(async move {
            if self.unreachable {
                return Err(ClusterError::Connection("connection refused".into()));
            }
            Ok(None)
        })
    }

    fn list<'a>(
        &'a self,
        kind: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<ClusterObject>, ClusterError>> {
        self.inner.list(kind, namespace)
    }

    fn create<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        self.inner.create(object)
    }

    fn patch<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        self.inner.patch(object)
    }

    fn delete<'a>(&'a self, key: &'a ObjectKey) -> BoxFuture<'a, Result<(), ClusterError>> {
        self.inner.delete(key)
    }
}
