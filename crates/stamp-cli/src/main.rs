//! # stamp CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stamp_cli::content::{run_dedup, run_list, run_pin, DedupArgs, ListArgs, PinArgs};
use stamp_cli::ledger::{run_anchor, run_sync, AnchorArgs, SyncArgs};
use stamp_cli::wallet::{run_keygen, KeygenArgs};

/// Stamp service operator CLI.
///
/// Lists, deduplicates, pins and anchors files in the stamped directory,
/// and repairs the stamp log from the ledger.
#[derive(Parser, Debug)]
#[command(name = "stamp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List stamped files with pin and anchor state.
    List(ListArgs),

    /// Remove duplicate files from the stamped directory.
    Dedup(DedupArgs),

    /// Rebuild missing stamp records from the ledger.
    Sync(SyncArgs),

    /// Anchor a content id on the ledger.
    Anchor(AnchorArgs),

    /// Pin or unpin a content id.
    Pin(PinArgs),

    /// Generate an anchoring wallet seed.
    Keygen(KeygenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args, &mut std::io::stdout().lock()),
        command => run_online(command),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run a subcommand that needs the collaborators.
fn run_online(command: Commands) -> anyhow::Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async {
        let service = stamp_cli::service_from_env().await?;
        let mut stdout = std::io::stdout().lock();
        match command {
            Commands::List(args) => run_list(&args, &service, &mut stdout).await,
            Commands::Dedup(args) => run_dedup(&args, &service, &mut stdout).await,
            Commands::Sync(args) => run_sync(&args, &service, &mut stdout).await,
            Commands::Anchor(args) => run_anchor(&args, &service, &mut stdout).await,
            Commands::Pin(args) => run_pin(&args, &service, &mut stdout).await,
            Commands::Keygen(args) => run_keygen(&args, &mut stdout),
        }
    })
}
