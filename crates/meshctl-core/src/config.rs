use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::revision::installed_state_name;
use crate::spec::InstallSpec;

/// The merged, validated configuration for one apply run.
///
/// Built once by the resolver and never mutated afterwards; the reconciler
/// and the state recorder only ever see it by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    spec: InstallSpec,
}

impl ResolvedConfig {
    pub fn new(spec: InstallSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &InstallSpec {
        &self.spec
    }

    /// Empty string means the default, unversioned install.
    pub fn revision(&self) -> &str {
        &self.spec.revision
    }

    pub fn namespace(&self) -> &str {
        self.spec.effective_namespace()
    }

    /// Name of the installed-state record this config is stored under.
    pub fn record_name(&self) -> String {
        installed_state_name(self.revision())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(&self.spec)?)
    }
}
