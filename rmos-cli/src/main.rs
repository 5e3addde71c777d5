// rmos-cli/src/main.rs
// ============================================================================
// Module: RMOS CLI Entry Point
// Description: Command dispatcher for the ingress server and routing-truth
//              checks.
// Purpose: Provide a small, local-first CLI over the orchestration core's
//          HTTP surface.
// Dependencies: clap, rmos-config, rmos-contract, rmos-ingress, tokio
// ============================================================================

//! ## Overview
//! Two subcommands: `serve` starts the ingress HTTP server from a
//! configuration file, and `routing-truth check` compares a checked-in
//! snapshot against the routes the configured server would actually mount,
//! without binding a socket.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rmos_cli::check_routing_truth;
use rmos_config::RmosConfig;
use rmos_ingress::AppState;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rmos", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the ingress HTTP server.
    Serve(ServeCommand),
    /// Routing-truth snapshot utilities.
    RoutingTruth {
        /// Selected routing-truth subcommand.
        #[command(subcommand)]
        command: RoutingTruthCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to the configuration file. Defaults to `rmos.toml`, or the path
    /// named by `RMOS_CONFIG`, when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Routing-truth subcommands.
#[derive(Subcommand, Debug)]
enum RoutingTruthCommand {
    /// Compare a checked-in snapshot against the configured server's routes.
    Check(RoutingTruthCheckCommand),
}

/// Arguments for `routing-truth check`.
#[derive(Args, Debug)]
struct RoutingTruthCheckCommand {
    /// Path to the configuration file used to build the route registry.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to the checked-in `routing-truth.json` snapshot.
    #[arg(long, value_name = "PATH", default_value = "routing-truth.json")]
    snapshot: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] rmos_config::ConfigError),
    /// Application state could not be built from configuration.
    #[error("failed to build application state: {0}")]
    State(#[from] rmos_ingress::StateError),
    /// The ingress server exited with an error.
    #[error("server error: {0}")]
    Server(#[from] rmos_ingress::ServerError),
    /// Routing truth did not match the checked-in snapshot.
    #[error("{0}")]
    RoutingTruth(#[from] rmos_cli::RoutingTruthCheckError),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::RoutingTruth { command: RoutingTruthCommand::Check(command) } => command_routing_truth_check(&command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> Result<(), CliError> {
    let config = RmosConfig::load(command.config.as_deref())?;
    eprintln!("rmos: binding ingress server to {}", config.server.bind_addr);
    rmos_ingress::serve(&config).await?;
    Ok(())
}

// ============================================================================
// SECTION: Routing-Truth Command
// ============================================================================

/// Executes the `routing-truth check` command.
fn command_routing_truth_check(command: &RoutingTruthCheckCommand) -> Result<(), CliError> {
    let config = RmosConfig::load(command.config.as_deref())?;
    let state = AppState::build(&config)?;
    let live = state.routes.routing_truth();
    let warnings = check_routing_truth(&live, &command.snapshot)?;
    for warning in &warnings {
        eprintln!("rmos: warning: {warning}");
    }
    eprintln!("rmos: routing truth matches {} ({} routes)", command.snapshot.display(), live.count);
    Ok(())
}
