//! Vista Core - image similarity search and quadrilateral annotation.
//!
//! Vista embeds images with a DINOv2 vision transformer and stores the
//! vectors in Milvus or Weaviate for nearest-neighbour search:
//!
//! ```text
//! Directory → Discover → Validate → Decode → Embed (DINOv2) → Vector store
//! Query image → Embed (DINOv2) → nearest neighbours → text / JSON
//! ```
//!
//! It also carries a small annotator for marking four corner points on an
//! image and saving them as `[[x, y], ...]` JSON.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//! use vista_core::{Config, ImageEmbedder, VectorStoreFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let embedder = ImageEmbedder::from_config(&config)?;
//!
//!     let store = VectorStoreFactory::create(config.store.backend, &config.store);
//!     let query = Path::new("query.jpg");
//!     let query = embedder.embed_path(query, query).await?;
//!     for hit in store.search(&query.embedding, store.default_limit()).await? {
//!         println!("{} ({})", hit.path, hit.score);
//!     }
//!     store.close().await;
//!     Ok(())
//! }
//! ```

pub mod annotate;
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod types;

pub use annotate::{render_overlay, Annotator, Direction, Point, Quadrilateral};
pub use config::Config;
pub use embedding::{EmbeddingEngine, ModelSize};
pub use error::{
    AnnotationError, ConfigError, PipelineError, PipelineResult, Result, StoreError, StoreResult,
    VistaError,
};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{BatchOutcome, ImageEmbedder, ImageLoader};
pub use store::{CollectionStatus, StoreBackend, VectorStore, VectorStoreFactory};
pub use types::{HitMetadata, ImageMetadata, ImageRecord, Score, SearchHit};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
