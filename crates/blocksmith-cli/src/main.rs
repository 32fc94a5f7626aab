//! Blocksmith CLI
//!
//! Developer tool for block-based Arduino projects.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Blocksmith - block programs for the Arduino Nano 33 BLE
#[derive(Parser)]
#[command(name = "blocksmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "blocksmith.yaml", env = "BLOCKSMITH_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Blocksmith project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Generate the Arduino sketch
    Compile {
        /// Force regeneration (ignore cache)
        #[arg(long)]
        force: bool,

        /// Compile every workspace document under this directory instead of
        /// the project sketch
        #[arg(long)]
        dir: Option<String>,
    },

    /// Validate configuration and sketch without generating
    Validate,

    /// List the blocks available to the project
    Blocks {
        /// List every block, including ones locked by missing components
        #[arg(long)]
        all: bool,

        /// Print the palette as JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the sketch whenever its document changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Compile { force, dir } => {
            commands::compile::run(&cli.config, force, dir.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Blocks { all, json } => {
            commands::blocks::run(&cli.config, all, json).await?;
        }
        Commands::Watch => {
            commands::watch::run(&cli.config).await?;
        }
    }

    Ok(())
}
