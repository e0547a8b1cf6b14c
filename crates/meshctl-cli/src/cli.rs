use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use meshctl_cluster::ConnectionDescriptor;
use meshctl_core::{FieldPath, OverlayList, ScalarValue, SetOverlay};
use meshctl_install::{ApplyFlags, ApplyRequest, DEFAULT_READINESS_TIMEOUT};

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "meshctl")]
#[command(about = "Install and upgrade the mesh control plane")]
#[command(version)]
pub struct Cli {
    /// Compute everything, write nothing to the cluster
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug logging; print the full applied manifest
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a mesh configuration to the cluster
    Apply(ApplyArgs),
    /// Same as `apply`
    Install(ApplyArgs),
}

impl Command {
    pub fn args(&self) -> &ApplyArgs {
        match self {
            Command::Apply(args) | Command::Install(args) => args,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ApplyArgs {
    /// Config file to merge, in order (repeatable)
    #[arg(short = 'f', long = "filename", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Path to the kubeconfig file
    #[arg(short = 'c', long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub skip_confirmation: bool,

    /// Proceed even when the configuration has validation issues
    #[arg(long)]
    pub force: bool,

    /// Maximum time to wait for resources to become ready (e.g. 300, 90s, 5m)
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub readiness_timeout: Option<Duration>,

    /// Wait until all applied resources are ready
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Override a config value, e.g. `values.grafana.enabled=true` (repeatable)
    #[arg(short = 's', long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Install package directory holding profiles
    #[arg(short = 'd', long, value_name = "DIR")]
    pub charts: Option<PathBuf>,
}

/// Bare numbers are seconds; anything else uses jiff's duration syntax.
pub fn parse_timeout(raw: &str) -> Result<Duration, String> {
    if let Ok(secs) = raw.trim().parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let parsed: jiff::SignedDuration = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration {raw:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|_| format!("duration {raw:?} must not be negative"))
}

/// Merge flags with the defaults file into one request.
pub fn build_request(
    args: &ApplyArgs,
    dry_run: bool,
    verbose: bool,
    defaults: Option<&CliConfig>,
) -> eyre::Result<ApplyRequest> {
    let defaults = defaults.cloned().unwrap_or_default();

    let mut overlays = OverlayList::parse_all(args.set.as_slice())?;
    if let Some(charts) = args.charts.clone().or(defaults.charts) {
        overlays.push(SetOverlay {
            path: FieldPath::parse("installPackagePath")?,
            value: ScalarValue::String(charts.display().to_string()),
        });
    }

    let wait_timeout = args
        .readiness_timeout
        .or(defaults.readiness_timeout_secs.map(Duration::from_secs))
        .unwrap_or(DEFAULT_READINESS_TIMEOUT);

    Ok(ApplyRequest {
        files: args.files.clone(),
        overlays,
        connection: ConnectionDescriptor {
            kubeconfig: args.kubeconfig.clone().or(defaults.kubeconfig),
            context: args.context.clone().or(defaults.context),
        },
        flags: ApplyFlags {
            force: args.force,
            dry_run,
            verbose,
            wait: args.wait,
            wait_timeout,
        },
    })
}

/// Only a bare `apply` against a live cluster asks first.
pub fn needs_confirmation(args: &ApplyArgs, dry_run: bool) -> bool {
    args.files.is_empty() && args.set.is_empty() && !dry_run && !args.skip_confirmation
}

pub const CONFIRM_PROMPT: &str = "This will install the default profile into the cluster. Proceed? (y/N) ";

/// Ask on `output`, read one line from `input`. Only `y`/`yes` confirm.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> std::io::Result<bool> {
    output.write_all(CONFIRM_PROMPT.as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
