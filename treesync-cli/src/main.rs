//! treesync CLI - command-line interface
//!
//! This binary provides a command-line interface to the treesync library:
//! an `update` command that synchronizes a local directory against a
//! published manifest, and a `generate` command that produces the manifest
//! on the server side.

use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "treesync")]
#[command(about = "Incremental directory synchronization over HTTP", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize a local directory against a published manifest
    Update(commands::update::UpdateArgs),
    /// Generate a hash manifest from a directory tree
    Generate(commands::generate::GenerateArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Update(args) => commands::update::run(args),
        Commands::Generate(args) => commands::generate::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
