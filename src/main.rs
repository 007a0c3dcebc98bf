//! Middle-Chain CLI Application
//!
//! A command-line interface for inspecting the middleware registry and
//! replaying governance history against a data directory.

use clap::{Parser, Subcommand};
use middle_chain::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "middled")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Stake-governed contract middleware node", long_about = None)]
struct Cli {
    /// Data directory for the base store
    #[arg(short, long, default_value = ".middle_data")]
    data_dir: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the middleware registry
    List,

    /// Replay governance requests, calls and blocks from a file
    Replay {
        /// JSON array of steps
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let state = AppState::new(cli.data_dir.clone(), cli.config.as_deref())?;

    match cli.command {
        Commands::List => {
            cli::cmd_list(&state)?;
        }
        Commands::Replay { file } => {
            cli::cmd_replay(&state, &file)?;
        }
    }

    Ok(())
}
