//! Pipeline orchestration: validate → decode → metadata → embed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::config::Config;
use crate::embedding::EmbeddingEngine;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageMetadata, ImageRecord};

use super::decode::{DecodedImage, ImageDecoder};
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::metadata::{ImageStats, MetadataExtractor};
use super::validate::Validator;

/// An image that passed validation and decoding, waiting to be embedded.
pub struct PreparedImage {
    pub path: PathBuf,
    pub image: DynamicImage,
    pub metadata: ImageMetadata,
}

/// Result of embedding one chunk of files.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully embedded images, in input order
    pub records: Vec<ImageRecord>,
    /// Files that were skipped, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Validation and decoding stages, usable without a loaded model.
pub struct ImageLoader {
    decoder: ImageDecoder,
    validator: Validator,
    discovery: FileDiscovery,
}

impl ImageLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            validator: Validator::new(config.limits.clone()),
            discovery: FileDiscovery::new(config.processing.clone()),
        }
    }

    /// Discover supported image files at a path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }

    /// Validate and decode one file.
    pub async fn load(&self, path: &Path) -> PipelineResult<DecodedImage> {
        self.validator.validate(path)?;
        self.decoder.decode(path).await
    }

    /// Validate, decode, and collect metadata for one file.
    pub async fn prepare(&self, path: &Path) -> PipelineResult<PreparedImage> {
        let start = Instant::now();
        let decoded = self.load(path).await?;
        let metadata = MetadataExtractor::from_decoded(&decoded);
        tracing::trace!("  Prepared {:?} in {:?}", path, start.elapsed());

        Ok(PreparedImage {
            path: path.to_path_buf(),
            image: decoded.image,
            metadata,
        })
    }

    /// Prepare every file of a chunk, best effort.
    ///
    /// Files that fail validation or decoding are logged and returned in the
    /// second list with the reason; the rest keep their input order.
    pub async fn prepare_chunk(
        &self,
        files: &[DiscoveredFile],
    ) -> (Vec<PreparedImage>, Vec<(PathBuf, String)>) {
        let mut prepared = Vec::with_capacity(files.len());
        let mut failed = Vec::new();
        for file in files {
            match self.prepare(&file.path).await {
                Ok(p) => prepared.push(p),
                Err(e) => {
                    tracing::warn!("Error opening image {:?}: {}", file.path, e);
                    failed.push((file.path.clone(), e.to_string()));
                }
            }
        }
        (prepared, failed)
    }

    /// Detailed statistics for one image.
    pub async fn stats(&self, path: &Path) -> PipelineResult<ImageStats> {
        let decoded = self.load(path).await?;
        Ok(MetadataExtractor::stats(path, &decoded))
    }
}

/// Turns image files into [`ImageRecord`]s with a loaded DINOv2 model.
pub struct ImageEmbedder {
    loader: ImageLoader,
    engine: Arc<EmbeddingEngine>,
    embed_timeout_ms: u64,
}

impl ImageEmbedder {
    /// Create an embedder around an already-loaded engine.
    pub fn new(config: &Config, engine: EmbeddingEngine) -> Self {
        Self {
            loader: ImageLoader::new(config),
            engine: Arc::new(engine),
            embed_timeout_ms: config.limits.embed_timeout_ms,
        }
    }

    /// Load the model named by `config.embedding` and build an embedder.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let engine = EmbeddingEngine::load(&config.embedding, &config.model_dir())?;
        Ok(Self::new(config, engine))
    }

    /// Length of the vectors this embedder produces.
    pub fn dimension(&self) -> usize {
        self.engine.dimension()
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Embed a single image; `root` decides the stored relative path.
    pub async fn embed_path(&self, path: &Path, root: &Path) -> PipelineResult<ImageRecord> {
        let prepared = self.loader.prepare(path).await?;
        let mut records = self.embed_prepared(vec![prepared], root).await?;
        records.pop().ok_or_else(|| PipelineError::Embedding {
            path: path.to_path_buf(),
            message: "Model returned no embedding".to_string(),
        })
    }

    /// Embed one chunk of files with a single inference call.
    ///
    /// Files that fail validation or decoding are logged and skipped; if the
    /// inference call itself fails, every remaining file in the chunk is
    /// reported as failed.
    pub async fn embed_chunk(&self, files: &[DiscoveredFile], root: &Path) -> BatchOutcome {
        let (prepared, failed) = self.loader.prepare_chunk(files).await;
        let mut outcome = BatchOutcome {
            records: Vec::new(),
            failed,
        };

        if prepared.is_empty() {
            return outcome;
        }

        let paths: Vec<PathBuf> = prepared.iter().map(|p| p.path.clone()).collect();
        match self.embed_prepared(prepared, root).await {
            Ok(records) => outcome.records = records,
            Err(e) => {
                tracing::error!("Embedding batch failed: {}", e);
                let message = e.to_string();
                outcome
                    .failed
                    .extend(paths.into_iter().map(|p| (p, message.clone())));
            }
        }

        outcome
    }

    async fn embed_prepared(
        &self,
        prepared: Vec<PreparedImage>,
        root: &Path,
    ) -> PipelineResult<Vec<ImageRecord>> {
        let first_path = prepared
            .first()
            .map(|p| p.path.clone())
            .unwrap_or_default();
        let tensors: Vec<_> = prepared
            .iter()
            .map(|p| self.engine.preprocess(&p.image))
            .collect();
        let paths: Vec<PathBuf> = prepared.iter().map(|p| p.path.clone()).collect();

        let engine = Arc::clone(&self.engine);
        let task =
            tokio::task::spawn_blocking(move || engine.embed_preprocessed(&tensors, &paths));

        let embeddings = match tokio::time::timeout(
            Duration::from_millis(self.embed_timeout_ms),
            task,
        )
        .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(PipelineError::Embedding {
                    path: first_path,
                    message: format!("Task join error: {}", e),
                })
            }
            Err(_) => {
                return Err(PipelineError::Timeout {
                    path: first_path,
                    stage: "embed".to_string(),
                    timeout_ms: self.embed_timeout_ms,
                })
            }
        };

        Ok(prepared
            .into_iter()
            .zip(embeddings)
            .map(|(p, embedding)| build_record(p.path, root, embedding, Some(p.metadata)))
            .collect())
    }
}

/// Assemble an [`ImageRecord`], deriving the filename and root-relative path.
pub fn build_record(
    path: PathBuf,
    root: &Path,
    embedding: Vec<f32>,
    metadata: Option<ImageMetadata>,
) -> ImageRecord {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    let relative_path = path
        .strip_prefix(root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&filename));

    ImageRecord {
        path,
        relative_path,
        filename,
        embedding,
        metadata,
    }
}
