//! DINOv2 embedding generation.
//!
//! Converts images into fixed-length, L2-normalized vectors using a DINOv2
//! vision transformer exported to ONNX and run locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vista_core::embedding::EmbeddingEngine;
//! use vista_core::Config;
//!
//! let config = Config::default();
//! let engine = EmbeddingEngine::load(&config.embedding, &config.model_dir())?;
//! let tensor = engine.preprocess(&decoded.image);
//! let embeddings = engine.embed_preprocessed(&[tensor], &[path])?;
//! assert_eq!(embeddings[0].len(), 768); // base model
//! ```

pub(crate) mod dinov2;
pub(crate) mod preprocess;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

pub use self::preprocess::preprocess;
use self::dinov2::DinoSession;

/// The ONNX model filename inside each variant directory.
const MODEL_FILENAME: &str = "model.onnx";

/// DINOv2 model variants. The embedding dimension is fixed per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    #[default]
    Base,
    Large,
    Giant,
}

impl ModelSize {
    /// All variants, smallest first.
    pub const ALL: [ModelSize; 4] = [
        ModelSize::Small,
        ModelSize::Base,
        ModelSize::Large,
        ModelSize::Giant,
    ];

    /// Length of the embedding vector this variant produces.
    pub fn dimension(self) -> usize {
        match self {
            ModelSize::Small => 384,
            ModelSize::Base => 768,
            ModelSize::Large => 1024,
            ModelSize::Giant => 1536,
        }
    }

    /// Backbone name as published by the DINOv2 authors (patch size 14).
    pub fn hub_name(self) -> &'static str {
        match self {
            ModelSize::Small => "dinov2_vits14",
            ModelSize::Base => "dinov2_vitb14",
            ModelSize::Large => "dinov2_vitl14",
            ModelSize::Giant => "dinov2_vitg14",
        }
    }

    /// Local directory name under the model dir.
    pub fn dir_name(self) -> String {
        format!("dinov2-{self}")
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Small => "small",
            ModelSize::Base => "base",
            ModelSize::Large => "large",
            ModelSize::Giant => "giant",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" | "vits14" => Ok(ModelSize::Small),
            "base" | "vitb14" => Ok(ModelSize::Base),
            "large" | "vitl14" => Ok(ModelSize::Large),
            "giant" | "vitg14" => Ok(ModelSize::Giant),
            other => Err(format!(
                "unknown DINOv2 model size '{other}' (expected small, base, large or giant)"
            )),
        }
    }
}

/// Engine for generating image embeddings via DINOv2.
pub struct EmbeddingEngine {
    session: DinoSession,
    model_size: ModelSize,
    resize: u32,
    crop_size: u32,
}

impl EmbeddingEngine {
    /// Load the DINOv2 encoder from the model directory.
    ///
    /// Expects the ONNX model at `{model_dir}/dinov2-{size}/model.onnx`.
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let model_path = Self::model_path(config, model_dir);

        if !model_path.exists() {
            return Err(PipelineError::Embedding {
                path: model_path,
                message: "Model not found. Run `vista models download` first.".to_string(),
            });
        }

        tracing::info!(
            "Loading DINOv2 model {} from {:?}",
            config.model_size.hub_name(),
            model_path
        );
        let session = DinoSession::load(&model_path, config.model_size.dimension())?;
        tracing::info!("DINOv2 model loaded successfully");

        Ok(Self {
            session,
            model_size: config.model_size,
            resize: config.resize,
            crop_size: config.crop_size,
        })
    }

    /// The loaded model variant.
    pub fn model_size(&self) -> ModelSize {
        self.model_size
    }

    /// Length of every vector this engine returns.
    pub fn dimension(&self) -> usize {
        self.model_size.dimension()
    }

    /// Preprocess an image into the `[1, 3, crop, crop]` tensor this engine expects.
    ///
    /// Lets callers build tensors on the async side and hand only the tensors
    /// to `spawn_blocking`, instead of cloning whole images across threads.
    pub fn preprocess(&self, image: &DynamicImage) -> ndarray::Array4<f32> {
        preprocess(image, self.resize, self.crop_size)
    }

    /// Embed tensors produced by [`EmbeddingEngine::preprocess`] with one
    /// inference call, returning one L2-normalized vector per tensor.
    ///
    /// `paths` is used for error context only and must be parallel to `tensors`.
    pub fn embed_preprocessed(
        &self,
        tensors: &[ndarray::Array4<f32>],
        paths: &[PathBuf],
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.session.embed_batch(tensors, paths)
    }

    /// Check whether the model file exists on disk.
    pub fn model_exists(config: &EmbeddingConfig, model_dir: &Path) -> bool {
        Self::model_path(config, model_dir).exists()
    }

    /// Get the expected model file path.
    pub fn model_path(config: &EmbeddingConfig, model_dir: &Path) -> PathBuf {
        model_dir
            .join(config.model_size.dir_name())
            .join(MODEL_FILENAME)
    }
}
