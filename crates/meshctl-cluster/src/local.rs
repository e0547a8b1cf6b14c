use std::path::{Path, PathBuf};

use crate::client::{BoxFuture, ClusterClient};
use crate::error::ClusterError;
use crate::object::{admit, ClusterObject, ObjectKey};

/// Directory name holding cluster-scoped objects.
const CLUSTER_SCOPE_DIR: &str = "_cluster";

/// Directory-backed cluster: one JSON file per object at
/// `<root>/<namespace|_cluster>/<kind>/<name>.json`.
///
/// Writes are atomic (tmp + rename), so an interrupted apply leaves every
/// object either at its old or its new content.
pub struct LocalCluster {
    root: PathBuf,
}

impl LocalCluster {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ClusterError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened local cluster");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        self.root
            .join(key.namespace.as_deref().unwrap_or(CLUSTER_SCOPE_DIR))
            .join(key.kind.to_lowercase())
            .join(format!("{}.json", key.name))
    }

    fn read(&self, path: &Path) -> Result<Option<ClusterObject>, ClusterError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&json)?))
    }

    fn write(&self, key: &ObjectKey, object: &ClusterObject) -> Result<(), ClusterError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(object)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &path)?;
        tracing::debug!(key = %key, path = %path.display(), "object written");
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<ClusterObject>, ClusterError> {
        if !dir.is_dir() {
            return Ok(vec![]);
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut objects = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(object) = self.read(&path)? {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

impl ClusterClient for LocalCluster {
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<ClusterObject>, ClusterError>> {
        Box::pin(async move { self.read(&self.path_for(key)) })
    }

    fn list<'a>(
        &'a self,
        kind: &'a str,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<ClusterObject>, ClusterError>> {
        Box::pin(async move {
            let kind_dir = kind.to_lowercase();
            if let Some(ns) = namespace {
                return self.list_dir(&self.root.join(ns).join(&kind_dir));
            }

            let mut scopes: Vec<PathBuf> = std::fs::read_dir(&self.root)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_dir())
                .collect();
            scopes.sort();

            let mut objects = Vec::new();
            for scope in scopes {
                objects.extend(self.list_dir(&scope.join(&kind_dir))?);
            }
            Ok(objects)
        })
    }

    fn create<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            object.validate().map_err(ClusterError::InvalidObject)?;
            let key = object.key();
            if self.path_for(&key).exists() {
                return Err(ClusterError::AlreadyExists { key });
            }
            let stored = admit(object.clone());
            self.write(&key, &stored)?;
            Ok(stored)
        })
    }

    fn patch<'a>(
        &'a self,
        object: &'a ClusterObject,
    ) -> BoxFuture<'a, Result<ClusterObject, ClusterError>> {
        Box::pin(async move {
            let key = object.key();
            let live = self
                .read(&self.path_for(&key))?
                .ok_or_else(|| ClusterError::NotFound { key: key.clone() })?;
            let patched = object.patched_onto(live);
            self.write(&key, &patched)?;
            Ok(patched)
        })
    }

    fn delete<'a>(&'a self, key: &'a ObjectKey) -> BoxFuture<'a, Result<(), ClusterError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            if !path.exists() {
                return Err(ClusterError::NotFound { key: key.clone() });
            }
            std::fs::remove_file(&path)?;
            tracing::debug!(key = %key, "object deleted");
            Ok(())
        })
    }
}
