//! Error types for Vista.
//!
//! Errors are organized by concern so that messages carry the context a user
//! needs to act on them (file paths, HTTP status codes, point counts).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Vista operations.
#[derive(Error, Debug)]
pub enum VistaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image pipeline errors (discovery, decode, embedding)
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Vector database errors
    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),

    /// Annotation errors
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Embedding generation failed
    #[error("Embedding failed for {path}: {message}")]
    Embedding { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Errors talking to a vector database.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure (connection refused, DNS, timeout)
    #[error("{backend} request failed: {message}")]
    Connection { backend: String, message: String },

    /// The server answered with a non-success HTTP status
    #[error("{backend} HTTP {status_code}: {message}")]
    Http {
        backend: String,
        status_code: u16,
        message: String,
    },

    /// The server answered 200 but reported an application-level error
    #[error("{backend} API error: {message}")]
    Api { backend: String, message: String },

    /// The response body did not have the expected shape
    #[error("{backend} returned an unexpected response: {message}")]
    Response { backend: String, message: String },
}

impl StoreError {
    /// HTTP status code, when the error came from a non-success response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Errors from the quadrilateral annotator.
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// Saving requires exactly four points
    #[error("Please create exactly 4 points before saving (have {count})")]
    IncompletePolygon { count: usize },

    /// A points file did not contain four [x, y] pairs
    #[error("Invalid points file {path}: {message}")]
    InvalidPointsFile { path: PathBuf, message: String },

    /// Could not open the image being annotated
    #[error("Could not open image {path}: {message}")]
    ImageOpen { path: PathBuf, message: String },
}

/// Convenience type alias for Vista results.
pub type Result<T> = std::result::Result<T, VistaError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for vector store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_only_for_http() {
        let http = StoreError::Http {
            backend: "milvus".into(),
            status_code: 503,
            message: "unavailable".into(),
        };
        assert_eq!(http.status_code(), Some(503));

        let api = StoreError::Api {
            backend: "milvus".into(),
            message: "collection not found".into(),
        };
        assert_eq!(api.status_code(), None);
    }

    #[test]
    fn test_incomplete_polygon_message() {
        let err = AnnotationError::IncompletePolygon { count: 3 };
        assert!(err.to_string().contains("exactly 4 points"));
        assert!(err.to_string().contains("have 3"));
    }
}
