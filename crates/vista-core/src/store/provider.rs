//! Vector store trait and backend factory.

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::types::{ImageRecord, SearchHit};

use super::milvus::MilvusStore;
use super::weaviate::WeaviateStore;
use super::StoreBackend;

/// Whether `ensure_collection` had to create anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Created,
    Existing,
}

/// Trait that every vector database backend implements.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the CLI holds a `Box<dyn VectorStore>` chosen at runtime).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logging ("milvus", "weaviate").
    fn name(&self) -> &str;

    /// Check whether the server is reachable.
    async fn is_available(&self) -> bool;

    /// Create the collection (schema + HNSW index) if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> StoreResult<CollectionStatus>;

    /// Insert embedded images; returns how many the server accepted.
    async fn insert(&self, records: &[ImageRecord]) -> StoreResult<usize>;

    /// Make inserted rows durable and visible to the next search.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Nearest-neighbour search for `vector`, best match first.
    async fn search(&self, vector: &[f32], limit: usize) -> StoreResult<Vec<SearchHit>>;

    /// Results to return when the caller does not specify a limit.
    fn default_limit(&self) -> usize;

    /// Release server-side resources. Failures are logged, never returned.
    async fn close(&self);
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Returns `None` for empty strings and unset variables.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Creates the configured backend.
pub struct VectorStoreFactory;

impl VectorStoreFactory {
    pub fn create(backend: StoreBackend, config: &StoreConfig) -> Box<dyn VectorStore> {
        match backend {
            StoreBackend::Milvus => Box::new(MilvusStore::new(config)),
            StoreBackend::Weaviate => Box::new(WeaviateStore::new(config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_VISTA_123}"), None);
    }

    #[test]
    fn test_factory_picks_backend() {
        let config = StoreConfig::default();
        let milvus = VectorStoreFactory::create(StoreBackend::Milvus, &config);
        assert_eq!(milvus.name(), "milvus");
        assert_eq!(milvus.default_limit(), 3);

        let weaviate = VectorStoreFactory::create(StoreBackend::Weaviate, &config);
        assert_eq!(weaviate.name(), "weaviate");
        assert_eq!(weaviate.default_limit(), 5);
    }
}
