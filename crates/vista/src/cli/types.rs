//! CLI enum types shared by several commands: backend, model size, output format.

use clap::ValueEnum;
use vista_core::{ModelSize, OutputFormat as CoreOutputFormat, StoreBackend};

/// Vector database to use.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Backend {
    /// Milvus (REST v2)
    Milvus,
    /// Weaviate (REST + GraphQL)
    Weaviate,
}

impl From<Backend> for StoreBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Milvus => StoreBackend::Milvus,
            Backend::Weaviate => StoreBackend::Weaviate,
        }
    }
}

/// DINOv2 variant.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModelSizeArg {
    /// ViT-S/14, 384-dim vectors
    Small,
    /// ViT-B/14, 768-dim vectors
    Base,
    /// ViT-L/14, 1024-dim vectors
    Large,
    /// ViT-g/14, 1536-dim vectors
    Giant,
}

impl From<ModelSizeArg> for ModelSize {
    fn from(s: ModelSizeArg) -> Self {
        match s {
            ModelSizeArg::Small => ModelSize::Small,
            ModelSizeArg::Base => ModelSize::Base,
            ModelSizeArg::Large => ModelSize::Large,
            ModelSizeArg::Giant => ModelSize::Giant,
        }
    }
}

/// Search result formats.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Numbered listing (default)
    #[default]
    Text,
    /// JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Text => CoreOutputFormat::Text,
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
