use std::path::PathBuf;
use std::time::Duration;

use meshctl_cluster::ConnectionDescriptor;
use meshctl_core::OverlayList;

/// Default upper bound on the readiness wait.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(300);

/// Input to one apply run. Built once per invocation, never mutated.
#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    /// Config files, merged in order.
    pub files: Vec<PathBuf>,
    /// `--set` overlays, applied in order after the files.
    pub overlays: OverlayList,
    pub connection: ConnectionDescriptor,
    pub flags: ApplyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyFlags {
    /// Continue past validation issues (never past apply or wait failures).
    pub force: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Keep the full applied manifest in the report.
    pub verbose: bool,
    /// Block until applied resources report ready.
    pub wait: bool,
    pub wait_timeout: Duration,
}

impl Default for ApplyFlags {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            verbose: false,
            wait: false,
            wait_timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}
