use std::collections::HashMap;

use meshctl_cluster::{ClusterObject, ObjectKey};

/// What the reconciler has seen and done during one run.
///
/// Built fresh for every run and moved into the reconciler, so nothing
/// learned in one apply can leak into the next, even when both run in the
/// same process.
#[derive(Debug, Default)]
pub struct ObjectCache {
    applied: HashMap<ObjectKey, u64>,
    live: HashMap<ObjectKey, Option<ClusterObject>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if an identical object was already handled this run.
    pub fn already_applied(&self, object: &ClusterObject) -> bool {
        self.applied.get(&object.key()) == Some(&object.fingerprint())
    }

    pub fn mark_applied(&mut self, object: &ClusterObject) {
        self.applied.insert(object.key(), object.fingerprint());
    }

    /// Live state fetched earlier this run. The outer `None` means "not
    /// fetched yet", the inner one "fetched, doesn't exist".
    pub fn live(&self, key: &ObjectKey) -> Option<Option<&ClusterObject>> {
        self.live.get(key).map(Option::as_ref)
    }

    pub fn remember_live(&mut self, key: ObjectKey, object: Option<ClusterObject>) {
        self.live.insert(key, object);
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.live.is_empty()
    }
}
