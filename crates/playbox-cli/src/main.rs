//! Playbox CLI - unpack a toolchain archive safely, then edit, build, run
//! and format a single-file playground with it.

mod cli;
mod commands;
mod error;
mod observer;
mod output;
mod progress;
mod source;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use cli::Commands;
use commands::step::Step;
use output::OutputFormatter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `PLAYBOX_LOG=debug`.
const LOG_ENV: &str = "PLAYBOX_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match run(&cli, &*formatter) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            formatter.format_error(&err);
            std::process::exit(error::exit_code(&err));
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "playbox=debug,playbox_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Dispatches the subcommand and returns the process exit code.
fn run(cli: &Cli, formatter: &dyn OutputFormatter) -> Result<i32> {
    match &cli.command {
        Commands::Bootstrap(args) => {
            commands::bootstrap::execute(args, formatter, !cli.json && !cli.quiet)?;
            Ok(0)
        }
        Commands::Init => commands::step::execute(cli, Step::Init, formatter),
        Commands::Build => commands::step::execute(cli, Step::Build, formatter),
        Commands::Run(args) => commands::step::execute(
            cli,
            Step::Run {
                no_build: args.no_build,
            },
            formatter,
        ),
        Commands::Fmt => commands::step::execute(cli, Step::Fmt, formatter),
        Commands::Edit(args) => {
            commands::edit::execute(cli, args, formatter)?;
            Ok(0)
        }
        Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            Ok(0)
        }
    }
}
