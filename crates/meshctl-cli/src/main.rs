use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

use meshctl_cli::cli::Cli;
use meshctl_cli::run::{execute, Outcome};

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let defaults = meshctl_cli::config::load_config()?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    match execute(&cli, defaults.as_ref(), &mut input, &mut out).await? {
        Outcome::Completed => Ok(()),
        Outcome::Cancelled => std::process::exit(1),
    }
}
