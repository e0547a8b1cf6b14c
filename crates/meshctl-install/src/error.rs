use std::path::PathBuf;
use std::time::Duration;

use meshctl_core::ValidationIssue;
use thiserror::Error;

/// Every way an apply run can fail. Each variant aborts the rest of the
/// pipeline; none is retried.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("cannot connect to cluster: {0}")]
    Connection(String),

    #[error("validation failed:\n{}", format_issues(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error("failed to read {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {origin}: {reason}")]
    InvalidInput { origin: String, reason: String },

    #[error("invalid overlay: {0}")]
    Overlay(#[from] meshctl_core::CoreError),

    #[error("failed to prepare namespace {namespace}: {reason}")]
    Namespace { namespace: String, reason: String },

    #[error("errors occurred during apply:\n{0}")]
    Reconcile(String),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("timed out after {}s waiting for: {}", .timeout.as_secs(), .unready.join(", "))]
    Timeout {
        timeout: Duration,
        unready: Vec<String>,
    },

    #[error("failed to persist installed state {record}: {reason}")]
    Persistence { record: String, reason: String },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
