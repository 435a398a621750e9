use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hippocampus::cli;
use hippocampus::config::HippocampusConfig;

#[derive(Parser)]
#[command(name = "hippocampus", version, about = "Encrypted knowledge-graph memory engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Print a knowledge-graph export to stdout
    Export {
        /// Export format: json, claude-md, or markdown
        #[arg(long, default_value = "json")]
        format: String,
        /// Restrict to one entity by name
        #[arg(long)]
        entity: Option<String>,
        /// Restrict to entities of this type
        #[arg(long = "type")]
        entity_type: Option<String>,
    },
    /// Embed any observations missing an embedding row
    Backfill,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to the cache directory
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = HippocampusConfig::load()?;

    // Log to stderr so stdout stays clean for export output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
        Command::Export {
            format,
            entity,
            entity_type,
        } => {
            cli::export::export(&config, &format, entity.as_deref(), entity_type.as_deref())?;
        }
        Command::Backfill => {
            cli::backfill::backfill(&config)?;
        }
    }

    Ok(())
}
