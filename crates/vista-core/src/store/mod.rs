//! Vector database backends.
//!
//! Both backends speak plain HTTP through `reqwest`:
//! - **milvus**: Milvus v2 REST API, HNSW/COSINE index, full image paths
//! - **weaviate**: Weaviate REST + GraphQL, root-relative paths plus metadata

mod client;
pub mod milvus;
pub mod provider;
pub mod retry;
pub mod weaviate;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use milvus::MilvusStore;
pub use provider::{resolve_env_var, CollectionStatus, VectorStore, VectorStoreFactory};
pub use weaviate::WeaviateStore;

/// Which vector database to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Milvus,
    Weaviate,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Milvus => "milvus",
            StoreBackend::Weaviate => "weaviate",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "milvus" => Ok(StoreBackend::Milvus),
            "weaviate" => Ok(StoreBackend::Weaviate),
            other => Err(format!(
                "unknown store backend '{other}' (expected milvus or weaviate)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse_and_display() {
        assert_eq!("Weaviate".parse::<StoreBackend>().unwrap(), StoreBackend::Weaviate);
        assert_eq!(StoreBackend::Milvus.to_string(), "milvus");
        assert!("qdrant".parse::<StoreBackend>().is_err());
        assert_eq!(StoreBackend::default(), StoreBackend::Milvus);
    }
}
