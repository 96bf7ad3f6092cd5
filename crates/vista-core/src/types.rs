//! Core data types shared by the pipeline and the vector store backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// An embedded image, ready to be written to a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path as discovered on disk
    pub path: PathBuf,

    /// Path relative to the indexing root (the file name for single files)
    pub relative_path: PathBuf,

    /// Just the filename portion
    pub filename: String,

    /// L2-normalized DINOv2 embedding
    pub embedding: Vec<f32>,

    /// Basic image properties, when they could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

/// Basic image properties stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Detected format ("jpeg", "png", "webp", etc.)
    pub format: String,

    /// File size in kilobytes
    pub size_kb: f64,
}

/// Image properties returned with a search hit.
///
/// Stores may hold partial metadata, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_kb: Option<f64>,
}

impl HitMetadata {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.format.is_none()
            && self.size_kb.is_none()
    }
}

impl From<ImageMetadata> for HitMetadata {
    fn from(meta: ImageMetadata) -> Self {
        Self {
            width: Some(meta.width),
            height: Some(meta.height),
            format: Some(meta.format),
            size_kb: Some(meta.size_kb),
        }
    }
}

/// How close a search hit is to the query, in the backend's own terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    /// Score reported by a COSINE metric search (Milvus)
    Distance(f32),

    /// Certainty in [0, 1] (Weaviate); absent when the server omits it
    Certainty(Option<f32>),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Distance(d) => write!(f, "distance: {d:.4}"),
            Score::Certainty(Some(c)) => write!(f, "similarity: {c:.4}"),
            Score::Certainty(None) => write!(f, "similarity: not available"),
        }
    }
}

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// File name of the matched image
    pub filename: String,

    /// Stored path (absolute for Milvus, root-relative for Weaviate)
    pub path: String,

    /// Closeness to the query
    pub score: Score,

    /// Stored image properties, if the backend keeps them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HitMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_display() {
        assert_eq!(Score::Distance(0.25).to_string(), "distance: 0.2500");
        assert_eq!(Score::Certainty(Some(0.9)).to_string(), "similarity: 0.9000");
        assert_eq!(
            Score::Certainty(None).to_string(),
            "similarity: not available"
        );
    }

    #[test]
    fn test_search_hit_serialization_skips_missing_metadata() {
        let hit = SearchHit {
            filename: "cat.jpg".into(),
            path: "/photos/cat.jpg".into(),
            score: Score::Distance(0.5),
            metadata: None,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["score"]["kind"], "distance");
    }

    #[test]
    fn test_partial_hit_metadata_serializes_present_fields() {
        let meta = HitMetadata {
            format: Some("png".into()),
            ..HitMetadata::default()
        };
        assert!(!meta.is_empty());
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({ "format": "png" }));
        assert!(HitMetadata::default().is_empty());
    }
}
