//! CLI module — command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod init;
pub mod run;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use speedshare::config::Config;

#[derive(Parser)]
#[command(name = "speedshare")]
#[command(version)]
#[command(about = "Dynamic bandwidth arbiter for SABnzbd, Deluge and qBittorrent", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ~/.speedshare/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the arbiter loop in the foreground (default)
    Run,
    /// Probe each client once and show the allocation that would apply
    Status,
    /// Write a default config file to edit
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Parse arguments and dispatch. Called from `main`.
pub async fn run() -> Result<()> {
    // .env before anything reads the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run::execute(&config_path).await,
        Commands::Status => status::execute(&config_path).await,
        Commands::Init { force } => init::execute(&config_path, force),
    }
}
