//! The apply pipeline.
//!
//! ```text
//! START → CONFIG_RESOLVED → NAMESPACE_READY → RECONCILED(HEALTHY)
//!       → [WAITED_READY] → PERSISTED → DONE
//! ```
//!
//! Stages run strictly in order and any failure ends the run in
//! `FAILED(reason)`. `force` only softens config validation; a reconcile
//! error or a readiness timeout always fails the run. Under dry run every
//! stage still runs and reports its transition, but none writes.
//!
//! If persisting the installed state fails after a healthy reconcile, the
//! applied objects stay on the cluster without a record. Re-running the
//! apply is the way to recover.

use std::fmt;
use std::sync::Arc;

use meshctl_cluster::ClusterClient;
use meshctl_core::{ResolvedConfig, ValidationIssue};

use crate::cache::ObjectCache;
use crate::error::InstallError;
use crate::namespace::{ClusterNamespaces, NamespacePreparer};
use crate::readiness::{PollingWaiter, ReadinessWaiter, ResourceSet};
use crate::reconcile::{AppliedAction, ClusterReconciler, Reconcile, ReconcileOutcome};
use crate::record::{ClusterStateRecorder, StateRecorder};
use crate::request::ApplyRequest;
use crate::resolve::ConfigResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigResolved,
    NamespaceReady,
    /// Only reached with a healthy reconcile.
    Reconciled,
    WaitedReady,
    Persisted,
    Done,
    Failed(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Start => f.write_str("START"),
            Stage::ConfigResolved => f.write_str("CONFIG_RESOLVED"),
            Stage::NamespaceReady => f.write_str("NAMESPACE_READY"),
            Stage::Reconciled => f.write_str("RECONCILED(HEALTHY)"),
            Stage::WaitedReady => f.write_str("WAITED_READY"),
            Stage::Persisted => f.write_str("PERSISTED"),
            Stage::Done => f.write_str("DONE"),
            Stage::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// Called on every stage transition, including `Failed`.
pub type StageListener = Box<dyn Fn(&Stage) + Send + Sync>;

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub transitions: Vec<Stage>,
    pub config: ResolvedConfig,
    /// Validation issues let through by `force`.
    pub warnings: Vec<ValidationIssue>,
    /// Full applied manifest, kept only for verbose runs.
    pub manifest: Option<String>,
    pub record_name: String,
    pub actions: Vec<AppliedAction>,
}

pub struct ApplyOrchestrator {
    resolver: ConfigResolver,
    namespaces: Box<dyn NamespacePreparer>,
    reconciler: Box<dyn Reconcile>,
    waiter: Box<dyn ReadinessWaiter>,
    recorder: Box<dyn StateRecorder>,
    listener: Option<StageListener>,
}

impl ApplyOrchestrator {
    /// Pipeline with every collaborator backed by `client`.
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            resolver: ConfigResolver::new(),
            namespaces: Box::new(ClusterNamespaces::new(client.clone())),
            reconciler: Box::new(ClusterReconciler::new(client.clone())),
            waiter: Box::new(PollingWaiter::new(client.clone())),
            recorder: Box::new(ClusterStateRecorder::new(client)),
            listener: None,
        }
    }

    pub fn with_namespace_preparer(mut self, namespaces: Box<dyn NamespacePreparer>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Box<dyn Reconcile>) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_waiter(mut self, waiter: Box<dyn ReadinessWaiter>) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn with_recorder(mut self, recorder: Box<dyn StateRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_listener(mut self, listener: StageListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn enter(&self, transitions: &mut Vec<Stage>, stage: Stage) {
        match &stage {
            Stage::Failed(reason) => tracing::error!(reason = %reason, "apply failed"),
            other => tracing::info!(stage = %other, "apply stage reached"),
        }
        if let Some(listener) = &self.listener {
            listener(&stage);
        }
        transitions.push(stage);
    }

    /// Run the full pipeline once.
    pub async fn run(&self, request: &ApplyRequest) -> Result<ApplyReport, InstallError> {
        let mut transitions = Vec::new();
        self.enter(&mut transitions, Stage::Start);

        match self.run_stages(request, &mut transitions).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.enter(&mut transitions, Stage::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        request: &ApplyRequest,
        transitions: &mut Vec<Stage>,
    ) -> Result<ApplyReport, InstallError> {
        let flags = request.flags;

        let resolution = self
            .resolver
            .resolve(&request.files, &request.overlays, flags.force)?;
        let config = resolution.config;
        self.enter(transitions, Stage::ConfigResolved);

        self.namespaces.ensure(config.namespace(), flags.dry_run).await?;
        self.enter(transitions, Stage::NamespaceReady);

        let outcome = self
            .reconciler
            .reconcile(&config, ObjectCache::new(), flags.dry_run)
            .await;
        let (manifest_text, actions) = match outcome {
            ReconcileOutcome::Healthy {
                manifest_text,
                actions,
            } => (manifest_text, actions),
            ReconcileOutcome::Error { failures, .. } => {
                return Err(InstallError::Reconcile(failures.join("\n")));
            }
        };
        self.enter(transitions, Stage::Reconciled);

        if flags.wait {
            let resources = ResourceSet::parse(&manifest_text)?;
            tracing::info!(
                resources = resources.len(),
                timeout_secs = flags.wait_timeout.as_secs(),
                "waiting for resources to become ready"
            );
            self.waiter
                .wait_ready(&resources, flags.wait_timeout, flags.dry_run)
                .await?;
            self.enter(transitions, Stage::WaitedReady);
        }

        let record_name = self
            .recorder
            .persist(&config, config.revision(), flags.dry_run)
            .await?;
        self.enter(transitions, Stage::Persisted);

        self.enter(transitions, Stage::Done);
        Ok(ApplyReport {
            transitions: std::mem::take(transitions),
            config,
            warnings: resolution.warnings,
            manifest: flags.verbose.then_some(manifest_text),
            record_name,
            actions,
        })
    }
}
