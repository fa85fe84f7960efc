use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "trike")]
#[command(version, about = "Tricycle dispatch client: live departure countdown")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory containing .trike/trike.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Dispatch API base URL. Overrides trike.toml and TRIKE_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Socket server URL for realtime events. Overrides trike.toml and TRIKE_SOCKET_URL.
    #[arg(long, global = true)]
    pub socket_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count down to a timestamp (ISO-8601) without contacting the backend
    Countdown {
        timestamp: String,
    },
    /// Fetch the active dispatch once and show the time remaining
    Status,
    /// Follow the active dispatch live, refreshing on poll and realtime events
    Watch {
        /// Ignore the socket server and rely on polling only
        #[arg(long)]
        no_realtime: bool,
    },
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default trike.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Countdown { timestamp } => cmd::cmd_countdown(timestamp).await?,
        Commands::Status => cmd::cmd_status(&project_dir, &cli).await?,
        Commands::Watch { no_realtime } => cmd::cmd_watch(&project_dir, &cli, *no_realtime).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, &cli, command.clone())?,
    }

    Ok(())
}
