//! forkterm: open AI agents and commands in new terminal windows, and keep a
//! registry of what was forked.
//!
//! # Usage
//!
//! ```text
//! forkterm launch --type claude|gemini|raw --task <text> [--model <tier>] [--cwd <path>]
//!                 [--with-context <path>] [--no-output] [--new-window] [--skip-permissions]
//!                 [--task-id <id>] [--title <t>] [--close-on-exit] [--register] [--dry-run]
//! forkterm detect
//! forkterm registry add|status|list|get|update|remove|clear
//! ```
//!
//! Every invocation prints one JSON document on stdout. Diagnostics go to
//! stderr (`FORKTERM_LOG` / `RUST_LOG`, or `--verbose`).

mod commands;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{detect::DetectArgs, launch::LaunchArgs, registry::RegistryCommand, Env};
use forkterm_core::FailureKind;
use output::Outcome;

/// Filter variable consulted before `RUST_LOG`.
const LOG_ENV: &str = "FORKTERM_LOG";

/// Exit status for arguments clap rejected.
const USAGE_EXIT: u8 = 2;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "forkterm",
    version,
    about = "Fork AI agents and commands into new terminal sessions",
    long_about = None,
)]
struct Cli {
    /// Debug logging on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a new terminal running an agent or a shell command.
    Launch(LaunchArgs),

    /// Show which terminal launcher this host would use.
    Detect(DetectArgs),

    /// Inspect and update the forked-task registry.
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_error(err),
    };
    init_tracing(cli.verbose);

    let outcome = match run(cli.command) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            Outcome::from_error(&err)
        }
    };
    outcome.emit(1)
}

fn run(command: Commands) -> anyhow::Result<Outcome> {
    let env = Env::load()?;
    match command {
        Commands::Launch(args) => args.run(&env),
        Commands::Detect(args) => args.run(&env),
        Commands::Registry { command } => commands::registry::run(command, &env),
    }
}

/// Help and version print as usual; anything else clap rejects becomes an
/// `InvalidArguments` document.
fn usage_error(err: clap::Error) -> ExitCode {
    use clap::error::ErrorKind;

    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            let details = err.render().to_string();
            Outcome::failure(FailureKind::InvalidArguments, details.trim()).emit(USAGE_EXIT)
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
