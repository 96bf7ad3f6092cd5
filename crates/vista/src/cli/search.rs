//! The `vista search` command: find images similar to a query image.

use clap::Args;
use std::io::BufWriter;
use std::path::PathBuf;

use vista_core::{Config, OutputWriter};

use super::setup::{connect_store, load_embedder, StoreArgs};
use super::types::OutputFormat;

/// Arguments for the `search` command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query image
    #[arg(required = true)]
    pub query: PathBuf,

    /// Number of results (defaults to 3 for Milvus, 5 for Weaviate)
    #[arg(short = 'k', long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.query.is_file() {
        anyhow::bail!(
            "Query image does not exist: {:?}\n\n  Hint: Pass the path to an image file.",
            args.query
        );
    }

    let backend = args.store.apply(&mut config);
    config.validate()?;

    eprintln!("Searching for images similar to {}", args.query.display());

    let embedder = load_embedder(&config)?;
    let record = match embedder.embed_path(&args.query, &args.query).await {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("Query embedding error: {e}");
            anyhow::bail!("Failed to embed query image {}: {e}", args.query.display());
        }
    };

    let store = connect_store(backend, &config).await?;
    let limit = args.limit.unwrap_or_else(|| store.default_limit());
    let result = store.search(&record.embedding, limit).await;
    store.close().await;
    let hits = result?;
    tracing::debug!("{} returned {} hits", backend, hits.len());

    let stdout = std::io::stdout();
    let mut writer = OutputWriter::new(BufWriter::new(stdout.lock()), args.format.into(), true);
    writer.write_hits(&args.query.display().to_string(), &hits)?;
    writer.flush()?;
    Ok(())
}
