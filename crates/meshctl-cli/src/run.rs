use std::io::{BufRead, Write};

use meshctl_install::{format_err_chain, ApplyReport, InstallError};

use crate::cli::{build_request, confirm, needs_confirmation, Cli};
use crate::config::CliConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// Run the parsed command, writing user-facing output to `out`.
pub async fn execute(
    cli: &Cli,
    defaults: Option<&CliConfig>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> eyre::Result<Outcome> {
    let args = cli.command.args();

    if needs_confirmation(args, cli.dry_run) && !confirm(input, out)? {
        writeln!(out, "Cancelled.")?;
        return Ok(Outcome::Cancelled);
    }

    let request = build_request(args, cli.dry_run, cli.verbose, defaults)?;
    match meshctl_install::apply(&request).await {
        Ok(report) => {
            print_report(&report, cli.dry_run, out)?;
            Ok(Outcome::Completed)
        }
        Err(e) => {
            print_failure(&e, out)?;
            Err(eyre::eyre!(format_err_chain(&e)))
        }
    }
}

fn print_report(report: &ApplyReport, dry_run: bool, out: &mut impl Write) -> std::io::Result<()> {
    for warning in &report.warnings {
        writeln!(out, "! {warning}")?;
    }
    if let Some(manifest) = &report.manifest {
        writeln!(out, "{manifest}")?;
        for action in &report.actions {
            writeln!(out, "  {action}")?;
        }
    }
    if dry_run {
        writeln!(out, "✔ Dry run complete ({} objects, record {})", report.actions.len(), report.record_name)?;
    } else {
        writeln!(out, "✔ Installation complete")?;
    }
    Ok(())
}

fn print_failure(err: &InstallError, out: &mut impl Write) -> std::io::Result<()> {
    match err {
        InstallError::Reconcile(detail) => {
            writeln!(out, "✘ Errors were logged during apply operation:\n{detail}")
        }
        InstallError::Timeout { .. } => writeln!(out, "✘ Errors during wait:\n{err}"),
        other => writeln!(out, "✘ {}", format_err_chain(other)),
    }
}
