//! Applies a rendered manifest to the cluster.
//!
//! Per object: create if absent, patch if the live object has drifted, skip
//! if it already matches. Objects this install owns that are no longer
//! rendered are pruned once everything else applied cleanly.
//!
//! A failed object does not stop the run; the remaining objects are still
//! attempted and every failure is reported. Nothing is rolled back.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use meshctl_cluster::{BoxFuture, ClusterClient, ClusterError, ClusterObject, Manifest, ObjectKey};
use meshctl_core::spec::KNOWN_ADDONS;
use meshctl_core::ResolvedConfig;

use crate::cache::ObjectCache;
use crate::record::{list_installed_states, RECORD_KIND};
use crate::render::{addon_of, render, OWNED_BY_LABEL, RENDERED_KINDS, SHARED_OWNER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Unchanged,
    Prune,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Unchanged => "unchanged",
            Action::Prune => "prune",
        };
        f.write_str(s)
    }
}

/// One object and what the run did (or would do, under dry run) to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    pub key: ObjectKey,
    pub action: Action,
}

impl fmt::Display for AppliedAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.action, self.key)
    }
}

/// Result of one reconcile. There is no "error with healthy status" or
/// "ok with error status": the variant is the status.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Healthy {
        manifest_text: String,
        actions: Vec<AppliedAction>,
    },
    Error {
        /// Empty when rendering itself failed.
        manifest_text: String,
        failures: Vec<String>,
    },
}

impl ReconcileOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn manifest_text(&self) -> &str {
        match self {
            Self::Healthy { manifest_text, .. } | Self::Error { manifest_text, .. } => manifest_text,
        }
    }
}

pub trait Reconcile: Send + Sync {
    /// `cache` is owned by this call; pass a fresh one per run.
    fn reconcile<'a>(
        &'a self,
        config: &'a ResolvedConfig,
        cache: ObjectCache,
        dry_run: bool,
    ) -> BoxFuture<'a, ReconcileOutcome>;
}

pub struct ClusterReconciler {
    client: Arc<dyn ClusterClient>,
}

impl ClusterReconciler {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    async fn live(
        &self,
        cache: &mut ObjectCache,
        key: &ObjectKey,
    ) -> Result<Option<ClusterObject>, ClusterError> {
        if let Some(cached) = cache.live(key) {
            return Ok(cached.cloned());
        }
        let fetched = self.client.get(key).await?;
        cache.remember_live(key.clone(), fetched.clone());
        Ok(fetched)
    }

    async fn apply_one(
        &self,
        object: &ClusterObject,
        cache: &mut ObjectCache,
        dry_run: bool,
    ) -> Result<Action, ClusterError> {
        let key = object.key();
        let action = match self.live(cache, &key).await? {
            None => Action::Create,
            Some(live) if object.is_satisfied_by(&live) => Action::Unchanged,
            Some(_) => Action::Update,
        };

        if dry_run {
            return Ok(action);
        }
        let stored = match action {
            Action::Create => Some(self.client.create(object).await?),
            Action::Update => Some(self.client.patch(object).await?),
            Action::Unchanged | Action::Prune => None,
        };
        if let Some(stored) = stored {
            cache.remember_live(key, Some(stored));
        }
        Ok(action)
    }

    async fn apply_all(
        &self,
        manifest: &Manifest,
        cache: &mut ObjectCache,
        dry_run: bool,
    ) -> (Vec<AppliedAction>, Vec<String>) {
        let mut actions = Vec::new();
        let mut failures = Vec::new();

        for object in manifest.objects() {
            let key = object.key();
            if cache.already_applied(object) {
                tracing::debug!(key = %key, "duplicate object skipped");
                continue;
            }
            match self.apply_one(object, cache, dry_run).await {
                Ok(action) => {
                    tracing::debug!(key = %key, action = %action, dry_run, "object reconciled");
                    cache.mark_applied(object);
                    actions.push(AppliedAction { key, action });
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "object failed to apply");
                    failures.push(format!("{key}: {e}"));
                }
            }
        }

        (actions, failures)
    }

    /// Addons another installed revision still enables, as
    /// `(namespace, addon)`. The record of `config` itself does not count.
    async fn claimed_addons(&self, config: &ResolvedConfig) -> Result<BTreeSet<(String, &'static str)>, String> {
        let own = ObjectKey {
            kind: RECORD_KIND.into(),
            namespace: Some(config.namespace().to_string()),
            name: config.record_name(),
        };
        let records = list_installed_states(self.client.as_ref())
            .await
            .map_err(|e| e.to_string())?;

        let mut claimed = BTreeSet::new();
        for (key, other) in records.iter().filter(|(key, _)| *key != own) {
            for addon in KNOWN_ADDONS {
                if other.spec().addon_enabled(addon) {
                    tracing::debug!(record = %key, addon = *addon, "addon still claimed");
                    claimed.insert((other.namespace().to_string(), *addon));
                }
            }
        }
        Ok(claimed)
    }

    /// Delete objects owned by `config`'s record that are not in
    /// `desired`. Shared addons are only deleted once no other installed
    /// revision enables them.
    async fn prune(
        &self,
        config: &ResolvedConfig,
        desired: &BTreeSet<ObjectKey>,
        dry_run: bool,
    ) -> Result<Vec<AppliedAction>, Vec<String>> {
        let owner = config.record_name();
        let mut actions = Vec::new();
        let mut failures = Vec::new();
        let mut claimed: Option<BTreeSet<(String, &'static str)>> = None;

        for kind in RENDERED_KINDS {
            let live = match self.client.list(kind, None).await {
                Ok(live) => live,
                Err(e) => {
                    failures.push(format!("list {kind}: {e}"));
                    continue;
                }
            };
            let mut stale = Vec::new();
            for object in live.iter().filter(|o| !desired.contains(&o.key())) {
                match object.label(OWNED_BY_LABEL) {
                    Some(label) if label == owner => stale.push(object.key()),
                    Some(SHARED_OWNER) => {
                        // Only addons in the namespace this install renders into.
                        if object.metadata.namespace.as_deref() != Some(config.namespace()) {
                            continue;
                        }
                        let Some(addon) = addon_of(object) else { continue };
                        if claimed.is_none() {
                            match self.claimed_addons(config).await {
                                Ok(found) => claimed = Some(found),
                                Err(e) => {
                                    failures.push(format!("list {RECORD_KIND}: {e}"));
                                    return Err(failures);
                                }
                            }
                        }
                        let key = (config.namespace().to_string(), addon);
                        if claimed.as_ref().is_some_and(|c| c.contains(&key)) {
                            tracing::debug!(key = %object.key(), "shared addon kept");
                            continue;
                        }
                        stale.push(object.key());
                    }
                    _ => {}
                }
            }

            for key in stale {
                if !dry_run {
                    if let Err(e) = self.client.delete(&key).await {
                        tracing::warn!(key = %key, error = %e, "prune failed");
                        failures.push(format!("{key}: {e}"));
                        continue;
                    }
                }
                tracing::info!(key = %key, dry_run, "pruned");
                actions.push(AppliedAction { key, action: Action::Prune });
            }
        }

        if failures.is_empty() {
            Ok(actions)
        } else {
            Err(failures)
        }
    }
}

impl Reconcile for ClusterReconciler {
    fn reconcile<'a>(
        &'a self,
        config: &'a ResolvedConfig,
        mut cache: ObjectCache,
        dry_run: bool,
    ) -> BoxFuture<'a, ReconcileOutcome> {
        Box::pin(async move {
            let manifest = match render(config) {
                Ok(manifest) => manifest,
                Err(e) => {
                    return ReconcileOutcome::Error {
                        manifest_text: String::new(),
                        failures: vec![e.to_string()],
                    };
                }
            };
            let manifest_text = match manifest.to_yaml() {
                Ok(text) => text,
                Err(e) => {
                    return ReconcileOutcome::Error {
                        manifest_text: String::new(),
                        failures: vec![format!("failed to serialize manifest: {e}")],
                    };
                }
            };

            let (mut actions, mut failures) = self.apply_all(&manifest, &mut cache, dry_run).await;

            // Pruning after a partial failure could delete objects the
            // failed ones were meant to replace.
            if failures.is_empty() {
                let desired: BTreeSet<ObjectKey> = manifest.keys().into_iter().collect();
                match self.prune(config, &desired, dry_run).await {
                    Ok(pruned) => actions.extend(pruned),
                    Err(errs) => failures.extend(errs),
                }
            }

            tracing::info!(
                objects = manifest.len(),
                applied = cache.applied_count(),
                failures = failures.len(),
                dry_run,
                "reconcile finished"
            );

            if failures.is_empty() {
                ReconcileOutcome::Healthy {
                    manifest_text,
                    actions,
                }
            } else {
                ReconcileOutcome::Error {
                    manifest_text,
                    failures,
                }
            }
        })
    }
}
