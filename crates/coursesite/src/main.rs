//! coursesite CLI - build and serve a static site from markdown lessons.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod settings;
mod site;

#[derive(Parser)]
#[command(name = "coursesite")]
#[command(about = "Build and serve a static site from markdown lessons")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root containing Lessons/ and _includes/
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Path to coursesite.toml config file, relative to the project root
    #[arg(short, long, default_value = "coursesite.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static site into _site
    Build,

    /// Build, watch for changes and serve the site (default)
    Serve {
        /// Port to listen on (defaults to config or 8080)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to config or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
    },

    /// Remove the output directory
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Project root not found: {}", cli.root.display()))?;
    let settings = settings::load(&root, &cli.config)?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
    }) {
        Commands::Build => {
            commands::build::run(&root, &settings).await?;
        }
        Commands::Serve { port, host } => {
            commands::serve::run(&root, &settings, port, host).await?;
        }
        Commands::Clean => {
            commands::clean::run(&root, &settings)?;
        }
    }

    Ok(())
}
