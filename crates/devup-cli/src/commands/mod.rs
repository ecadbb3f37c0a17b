pub mod doctor;
pub mod start;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "devup",
    version,
    about = "Install dependencies and run the API and frontend dev servers together"
)]
pub struct Cli {
    /// Path to the config file (default: ./devup.toml, built-in defaults if absent)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install dependencies and run both dev servers (the default)
    Start,
    /// Check manifests, config and required tools without starting anything
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => start::run(config),
        Commands::Doctor => doctor::run(config),
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "devup", &mut std::io::stdout());
            Ok(())
        }
    }
}
