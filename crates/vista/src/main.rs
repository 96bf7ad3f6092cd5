//! Vista CLI - image similarity search with DINOv2 embeddings.
//!
//! Vista embeds images with a local DINOv2 model and stores the vectors in
//! Milvus or Weaviate. It also ships a small annotator for marking the four
//! corners of a region on an image.
//!
//! # Usage
//!
//! ```bash
//! # Download the default (base) model
//! vista models download
//!
//! # Index a directory into Milvus
//! vista index ./photos/
//!
//! # Find the 5 closest images in Weaviate
//! vista search query.jpg --backend weaviate -k 5
//!
//! # Mark four corner points and save them as JSON
//! vista annotate scan.png --output corners.json
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Vista - image similarity search over Milvus or Weaviate.
#[derive(Parser, Debug)]
#[command(name = "vista")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed a directory of images and insert them into a vector store
    Index(cli::index::IndexArgs),

    /// Find images similar to a query image
    Search(cli::search::SearchArgs),

    /// Mark four corner points on an image and save them as JSON
    Annotate(cli::annotate::AnnotateArgs),

    /// Print size, format and colour mode of an image
    Inspect(cli::inspect::InspectArgs),

    /// Manage DINOv2 models (download, list, verify)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match vista_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `vista config path`."
            );
            vista_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Vista v{}", vista_core::VERSION);

    match cli.command {
        Commands::Index(args) => cli::index::execute(args, config).await,
        Commands::Search(args) => cli::search::execute(args, config).await,
        Commands::Annotate(args) => cli::annotate::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
