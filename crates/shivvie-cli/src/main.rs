//! # Shivvie CLI
//!
//! Resolve a scaffolding module, validate input against it and apply its
//! actions.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI arguments (clap handles `--help` / `--version` early-exit).
//! 2. Initialise the tracing subscriber (logging).
//! 3. Load configuration (defaults + file + env).
//! 4. Build the [`OutputManager`] and the tokio runtime.
//! 5. Dispatch to the appropriate command handler.
//! 6. Translate any [`CliError`] into a user-facing message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                           |
//! |------|-----------------------------------|
//! |  0   | Success                           |
//! |  1   | Internal / external-tool error    |
//! |  2   | User / input error                |
//! |  3   | Resource not found                |
//! |  4   | Configuration error               |

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();

    // ── 1. Parse arguments ────────────────────────────────────────────────
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help / --version exit 0 through clap.
            if !e.use_stderr() {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            eprintln!("{}", e.render().ansi());
            return ExitCode::from(2);
        }
    };
    let verbose = cli.global.verbose > 0;

    // ── 2. Initialise tracing ─────────────────────────────────────────────
    if let Err(e) = init_logging(&cli.global) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }

    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        no_color = cli.global.no_color,
        "CLI started"
    );

    // ── 3. Load configuration ─────────────────────────────────────────────
    // `init` writes the file, so it must not require reading it first.
    let loaded = match cli.command {
        Commands::Init(_) => Ok(AppConfig::default()),
        _ => AppConfig::load(cli.global.config.as_ref()),
    };
    let config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => return handle_error(e, verbose),
    };

    // ── 4. Output manager + runtime ───────────────────────────────────────
    let output = OutputManager::new(&cli.global, &config);
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return handle_error(e.into(), verbose),
    };

    // ── 5. Dispatch + 6. Error handling ──────────────────────────────────
    match runtime.block_on(run(cli, config, output)) {
        Ok(()) => {
            info!("Shivvie completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose),
    }
}

/// Dispatch to the correct command handler.
#[instrument(skip_all)]
async fn run(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cli.command {
        Commands::Exec(cmd) => commands::exec::execute(cmd, cli.global, config, output).await,
        Commands::Info(cmd) => commands::info::execute(cmd, config, output).await,
        Commands::Init(cmd) => commands::init::execute(cmd, cli.global, output),
        Commands::Completions(cmd) => commands::completions::execute(cmd),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global, config, output),
    }
}

/// Translate a `CliError` into a user message and an appropriate exit code.
fn handle_error(err: CliError, verbose: bool) -> ExitCode {
    err.log();

    // stderr, so the message survives a redirected stdout.
    let msg = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────
