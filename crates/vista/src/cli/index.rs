//! The `vista index` command: embed a directory of images into a vector store.

use clap::Args;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use vista_core::pipeline::DiscoveredFile;
use vista_core::{CollectionStatus, Config, ImageEmbedder, VectorStore};

use super::setup::{connect_store, load_embedder, StoreArgs};

/// Arguments for the `index` command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory (or single image) to index
    #[arg(required = true)]
    pub directory: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Images embedded and inserted per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Only index the top level of the directory
    #[arg(long)]
    pub no_recursive: bool,
}

/// Totals reported after indexing.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct IndexSummary {
    pub found: usize,
    pub embedded: usize,
    pub inserted: usize,
    pub failed: usize,
}

/// Execute the index command.
pub async fn execute(args: IndexArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.directory.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the directory path and try again.",
            args.directory
        );
    }

    let backend = args.store.apply(&mut config);
    if let Some(batch_size) = args.batch_size {
        config.processing.batch_size = batch_size;
    }
    if args.no_recursive {
        config.processing.recursive = false;
    }
    config.validate()?;

    println!("Indexing images from {}", args.directory.display());

    let embedder = load_embedder(&config)?;
    let files = embedder.loader().discover(&args.directory);
    println!("Found {} images", files.len());
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.directory);
        return Ok(());
    }

    let store = connect_store(backend, &config).await?;

    let start = Instant::now();
    let result = run(
        &embedder,
        store.as_ref(),
        &files,
        &args.directory,
        config.processing.batch_size,
    )
    .await;
    store.close().await;

    let summary = result?;
    print_summary(&summary, start.elapsed());
    println!("Indexing complete");
    Ok(())
}

/// Ensure the collection, then embed and insert chunk by chunk.
async fn run(
    embedder: &ImageEmbedder,
    store: &dyn VectorStore,
    files: &[DiscoveredFile],
    root: &Path,
    batch_size: usize,
) -> anyhow::Result<IndexSummary> {
    match store.ensure_collection(embedder.dimension()).await? {
        CollectionStatus::Created => {
            tracing::info!("Created collection (dim {})", embedder.dimension())
        }
        CollectionStatus::Existing => tracing::debug!("Using existing collection"),
    }

    let batch_size = batch_size.max(1);
    let total_chunks = files.len().div_ceil(batch_size);
    let progress = create_progress_bar(files.len() as u64);
    let mut summary = IndexSummary {
        found: files.len(),
        ..IndexSummary::default()
    };

    for (i, chunk) in files.chunks(batch_size).enumerate() {
        tracing::info!("Processing batch {}/{}", i + 1, total_chunks);
        let outcome = embedder.embed_chunk(chunk, root).await;
        summary.embedded += outcome.records.len();
        summary.failed += outcome.failed.len();

        match store.insert(&outcome.records).await {
            Ok(n) => summary.inserted += n,
            Err(e) => {
                progress.abandon_with_message("insert failed");
                return Err(e.into());
            }
        }

        progress.inc(chunk.len() as u64);
        progress.set_message(format!("{} inserted", summary.inserted));
    }

    if let Err(e) = store.flush().await {
        tracing::warn!("Failed to flush {}: {}", store.name(), e);
    }

    progress.finish_with_message(format!("{} inserted", summary.inserted));
    Ok(summary)
}

/// Create a progress bar for indexing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn print_summary(summary: &IndexSummary, elapsed: Duration) {
    println!("Created embeddings for {} images", summary.embedded);

    let rate = if elapsed.as_secs_f64() > 0.0 {
        summary.embedded as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Found:        {:>8}", summary.found);
    eprintln!("    Embedded:     {:>8}", summary.embedded);
    eprintln!("    Inserted:     {:>8}", summary.inserted);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>6.1} img/sec", rate);
    eprintln!("  ====================================");
}
