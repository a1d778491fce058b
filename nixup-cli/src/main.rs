//! nixup — NixOS flake update manager.
//!
//! # Usage
//!
//! ```text
//! nixup update [--repo <path>] [--host <name>] [--no-ai] [--no-push]
//! nixup status [--repo <path>] [--json]
//! nixup generations [--repo <path>] [--limit <n>]
//! nixup init [--repo <path>] [--host <name>] [--force]
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    generations::GenerationsArgs, init::InitArgs, status::StatusArgs, update::UpdateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "nixup",
    version,
    about = "Synchronize, rebuild and commit a NixOS flake configuration",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull, rebuild, commit and push the configuration repository.
    Update(UpdateArgs),

    /// Show host and repository information.
    Status(StatusArgs),

    /// List recent system generations with the commit each was built from.
    Generations(GenerationsArgs),

    /// Write ~/.nixup/config.yaml.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Update(args) => args.run(),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Generations(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Init(args) => args.run().map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
