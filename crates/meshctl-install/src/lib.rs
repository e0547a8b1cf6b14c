//! meshctl-install
//!
//! The apply pipeline: resolve the install config, prepare the namespace,
//! reconcile the rendered objects, optionally wait for readiness, then record
//! the applied config as the installed state.
//!
//! Public API:
//! - `apply()`: connect to the cluster named by the request and run once
//! - `ApplyOrchestrator`: the pipeline itself, with swappable collaborators
//! - `ConfigResolver`: profile + files + overlays → `ResolvedConfig`
//! - `load_installed_state()`: read back the last recorded config

pub mod cache;
pub mod error;
pub mod namespace;
pub mod orchestrate;
pub mod profiles;
pub mod readiness;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod request;
pub mod resolve;

pub use crate::cache::ObjectCache;
pub use crate::error::{format_err_chain, InstallError};
pub use crate::namespace::{ClusterNamespaces, NamespacePreparer};
pub use crate::orchestrate::{ApplyOrchestrator, ApplyReport, Stage, StageListener};
pub use crate::readiness::{is_ready, PollingWaiter, ReadinessWaiter, ResourceSet};
pub use crate::reconcile::{Action, AppliedAction, ClusterReconciler, Reconcile, ReconcileOutcome};
pub use crate::record::{list_installed_states, load_installed_state, ClusterStateRecorder, StateRecorder};
pub use crate::request::{ApplyFlags, ApplyRequest, DEFAULT_READINESS_TIMEOUT};
pub use crate::resolve::{ConfigResolver, Resolution};

/// Connect to the request's cluster and run the pipeline once.
///
/// Failing to obtain a client is fatal: no stage runs.
pub async fn apply(request: &ApplyRequest) -> Result<ApplyReport, InstallError> {
    let client = meshctl_cluster::connect(&request.connection)
        .map_err(|e| InstallError::Connection(e.to_string()))?;
    ApplyOrchestrator::new(client).run(request).await
}
