//! The `vista models` command for managing DINOv2 models.

use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use vista_core::config::EmbeddingConfig;
use vista_core::pipeline::Hasher;
use vista_core::{Config, EmbeddingEngine, ModelSize};

use super::types::ModelSizeArg;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download a DINOv2 ONNX export from Hugging Face
    Download {
        /// Model size (defaults to `embedding.model_size` in config)
        #[arg(long, value_enum)]
        size: Option<ModelSizeArg>,

        /// Hugging Face repository to fetch from instead of the default
        #[arg(long)]
        repo: Option<String>,

        /// Re-download even if the model is already present
        #[arg(long)]
        force: bool,
    },

    /// List installed models
    List,

    /// Show model directory path
    Path,

    /// Recompute checksums of installed models and compare with the recorded ones
    Verify {
        /// Only verify this size
        #[arg(long, value_enum)]
        size: Option<ModelSizeArg>,
    },
}

/// Default Hugging Face repository for each DINOv2 size.
fn default_repo(size: ModelSize) -> String {
    format!("onnx-community/dinov2-{size}")
}

/// Path of the ONNX file inside the repository.
const REMOTE_PATH: &str = "onnx/model.onnx";

/// Suffix of the file holding the BLAKE3 digest recorded at download time.
const CHECKSUM_SUFFIX: &str = "blake3";

fn model_path(config: &Config, size: ModelSize) -> PathBuf {
    let embedding = EmbeddingConfig {
        model_size: size,
        ..config.embedding.clone()
    };
    EmbeddingEngine::model_path(&embedding, &config.model_dir())
}

fn checksum_path(model: &Path) -> PathBuf {
    let mut name = model.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(CHECKSUM_SUFFIX);
    model.with_file_name(name)
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download { size, repo, force } => {
            let size = size.map(ModelSize::from).unwrap_or(config.embedding.model_size);
            let dest = model_path(&config, size);

            if dest.exists() && !force {
                tracing::info!("DINOv2 {} already exists at {:?}", size, dest);
                return Ok(());
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let repo = repo.unwrap_or_else(|| default_repo(size));
            let url = format!("https://huggingface.co/{repo}/resolve/main/{REMOTE_PATH}");
            tracing::info!("Downloading DINOv2 {} ({})...", size, size.hub_name());
            tracing::info!("  Source: {}", url);
            tracing::info!("  Destination: {:?}", dest);

            let client = reqwest::Client::new();
            download_file(&client, &url, &dest).await?;

            let digest = Hasher::content_hash(&dest)?;
            std::fs::write(checksum_path(&dest), &digest)?;

            let file_size = std::fs::metadata(&dest)?.len();
            tracing::info!(
                "  DINOv2 {} complete ({:.1} MB, {}-dim embeddings)",
                size,
                file_size as f64 / (1024.0 * 1024.0),
                size.dimension()
            );
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();
            println!("Models directory: {}\n", model_dir.display());

            for size in ModelSize::ALL {
                let status = if model_path(&config, size).exists() {
                    "ready"
                } else {
                    "not installed"
                };
                let default_marker = if size == config.embedding.model_size {
                    "  (default)"
                } else {
                    ""
                };
                println!(
                    "  - {:14} {:>5}-dim  {:14}{}",
                    size.dir_name(),
                    size.dimension(),
                    status,
                    default_marker
                );
            }

            if !ModelSize::ALL.iter().any(|&s| model_path(&config, s).exists()) {
                println!("\nRun `vista models download` to download a model.");
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }

        ModelsCommand::Verify { size } => {
            let sizes: Vec<ModelSize> = match size {
                Some(s) => vec![s.into()],
                None => ModelSize::ALL.to_vec(),
            };

            let mut failures = 0;
            for size in sizes {
                let path = model_path(&config, size);
                if !path.exists() {
                    continue;
                }
                match verify_model(&path)? {
                    Verification::Ok => println!("  {:14} ok", size.dir_name()),
                    Verification::NoChecksum => {
                        println!("  {:14} no checksum recorded", size.dir_name())
                    }
                    Verification::Mismatch { expected, actual } => {
                        failures += 1;
                        println!(
                            "  {:14} MISMATCH\n    expected: {}\n    actual:   {}",
                            size.dir_name(),
                            expected,
                            actual
                        );
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!(
                    "{failures} model(s) failed verification.\n\n  \
                     Hint: Re-download with `vista models download --force`."
                );
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
enum Verification {
    Ok,
    NoChecksum,
    Mismatch { expected: String, actual: String },
}

/// Compare a model file against the digest recorded next to it.
fn verify_model(path: &Path) -> anyhow::Result<Verification> {
    let sidecar = checksum_path(path);
    if !sidecar.exists() {
        return Ok(Verification::NoChecksum);
    }
    let expected = std::fs::read_to_string(&sidecar)?.trim().to_string();
    let actual = Hasher::content_hash(path)
        .map_err(|e| anyhow::anyhow!("Checksum computation failed for {}: {e}", path.display()))?;

    if actual == expected {
        tracing::debug!("  Checksum verified: {}…", &actual[..16]);
        Ok(Verification::Ok)
    } else {
        Ok(Verification::Mismatch { expected, actual })
    }
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// A partial file is removed if the transfer fails.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    let result: anyhow::Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total_size {
                if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                    tracing::info!(
                        "  Progress: {:.0}%",
                        downloaded as f64 / total as f64 * 100.0
                    );
                }
            }
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    drop(file);

    if result.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}
