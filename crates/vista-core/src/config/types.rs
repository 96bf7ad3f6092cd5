//! Sub-configuration structs with their defaults.

use crate::embedding::ModelSize;
use crate::store::StoreBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.vista/models"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats (file extensions, case-insensitive)
    pub supported_formats: Vec<String>,

    /// Images embedded per chunk during indexing
    pub batch_size: usize,

    /// Descend into subdirectories when scanning
    pub recursive: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "bmp".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
            batch_size: 32,
            recursive: true,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Embedding timeout in milliseconds
    pub embed_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            embed_timeout_ms: 30000,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// DINOv2 variant
    pub model_size: ModelSize,

    /// Shorter-side length the image is resized to before cropping
    pub resize: u32,

    /// Side of the centre crop fed to the model
    pub crop_size: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_size: ModelSize::Base,
            resize: 256,
            crop_size: 224,
        }
    }
}

/// Vector store settings shared by both backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend `index` and `search` talk to
    pub backend: StoreBackend,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds (doubles per attempt)
    pub retry_delay_ms: u64,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Milvus settings
    pub milvus: MilvusConfig,

    /// Weaviate settings
    pub weaviate: WeaviateConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Milvus,
            retry_attempts: 3,
            retry_delay_ms: 500,
            request_timeout_ms: 30000,
            milvus: MilvusConfig::default(),
            weaviate: WeaviateConfig::default(),
        }
    }
}

/// Milvus connection, schema and HNSW parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MilvusConfig {
    /// REST endpoint
    pub endpoint: String,

    /// Collection name
    pub collection: String,

    /// Access token (supports ${ENV_VAR} syntax); empty disables auth
    pub token: String,

    /// Max length of the `image_path` VarChar field
    pub max_path_length: u32,

    /// HNSW edges per node
    pub hnsw_m: u32,

    /// HNSW build-time candidate list size
    pub hnsw_ef_construction: u32,

    /// HNSW query-time candidate list size
    pub search_ef: u32,

    /// Results returned when `--limit` is not given
    pub default_limit: usize,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:19530".to_string(),
            collection: "image_collection".to_string(),
            token: String::new(),
            max_path_length: 500,
            hnsw_m: 16,
            hnsw_ef_construction: 500,
            search_ef: 100,
            default_limit: 3,
        }
    }
}

/// Weaviate connection, class and HNSW parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaviateConfig {
    /// HTTP endpoint
    pub endpoint: String,

    /// Class (collection) name
    pub class_name: String,

    /// API key (supports ${ENV_VAR} syntax); empty disables auth
    pub api_key: String,

    /// HNSW query-time candidate list size
    pub ef: i64,

    /// HNSW build-time candidate list size
    pub ef_construction: u32,

    /// HNSW edges per node
    pub max_connections: u32,

    /// Vector cache size
    pub vector_cache_max_objects: u64,

    /// Results returned when `--limit` is not given
    pub default_limit: usize,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            class_name: "Image".to_string(),
            api_key: String::new(),
            ef: 200,
            ef_construction: 128,
            max_connections: 16,
            vector_cache_max_objects: 1_000_000,
            default_limit: 5,
        }
    }
}

/// Annotator interaction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// A click closer than this (in view pixels, on both axes) selects a point
    pub hit_radius: f64,

    /// Zoom multiplier for the zoom in/out actions
    pub button_zoom_step: f64,

    /// Zoom multiplier for one scroll-wheel notch
    pub wheel_zoom_step: f64,

    /// Zooming out stops once the factor is at or below this
    pub min_zoom: f64,

    /// Zooming in never goes past this factor
    pub max_zoom: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            hit_radius: 10.0,
            button_zoom_step: 1.2,
            wheel_zoom_step: 1.1,
            min_zoom: 0.1,
            max_zoom: 32.0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
