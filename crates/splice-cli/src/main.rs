//! Splice CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod adapters;
mod commands;

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Resolve include directives in pipeline configuration", long_about = None)]
struct Cli {
    /// Resolver settings file
    #[arg(long, global = true, env = "SPLICE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve includes and print the merged configuration
    Resolve {
        #[command(flatten)]
        args: commands::ResolveArgs,
        /// Print the provenance of spliced fragments as JSON instead
        #[arg(long)]
        provenance: bool,
    },
    /// Check that every include of a configuration resolves
    Validate {
        #[command(flatten)]
        args: commands::ResolveArgs,
    },
    /// List the built-in templates
    Templates,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so resolved output can be piped
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { args, provenance } => {
            commands::resolve(cli.config.as_deref(), &args, provenance).await?;
        }
        Commands::Validate { args } => {
            commands::validate(cli.config.as_deref(), &args).await?;
        }
        Commands::Templates => {
            commands::templates();
        }
    }

    Ok(())
}
