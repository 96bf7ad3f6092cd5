//! Shared setup for `index` and `search`: config overrides, model loading
//! and the store connection.

use clap::Args;
use vista_core::{
    Config, EmbeddingEngine, ImageEmbedder, StoreBackend, VectorStore, VectorStoreFactory,
};

use super::types::{Backend, ModelSizeArg};

/// Flags that select and address the vector store and model.
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Vector database backend (defaults to `store.backend` in config)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// DINOv2 model size (defaults to `embedding.model_size` in config)
    #[arg(long, value_enum)]
    pub model_size: Option<ModelSizeArg>,

    /// Server endpoint for the selected backend
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Milvus collection or Weaviate class name
    #[arg(long)]
    pub collection: Option<String>,
}

impl StoreArgs {
    /// Apply the flags on top of `config`, returning the selected backend.
    pub fn apply(&self, config: &mut Config) -> StoreBackend {
        if let Some(backend) = self.backend {
            config.store.backend = backend.into();
        }
        if let Some(size) = self.model_size {
            config.embedding.model_size = size.into();
        }

        let backend = config.store.backend;
        match backend {
            StoreBackend::Milvus => {
                if let Some(endpoint) = &self.endpoint {
                    config.store.milvus.endpoint = endpoint.clone();
                }
                if let Some(collection) = &self.collection {
                    config.store.milvus.collection = collection.clone();
                }
            }
            StoreBackend::Weaviate => {
                if let Some(endpoint) = &self.endpoint {
                    config.store.weaviate.endpoint = endpoint.clone();
                }
                if let Some(collection) = &self.collection {
                    config.store.weaviate.class_name = collection.clone();
                }
            }
        }
        backend
    }
}

/// Load the configured DINOv2 model, with a download hint when it is missing.
pub fn load_embedder(config: &Config) -> anyhow::Result<ImageEmbedder> {
    let model_dir = config.model_dir();
    if !EmbeddingEngine::model_exists(&config.embedding, &model_dir) {
        anyhow::bail!(
            "DINOv2 {} model not found at {:?}\n\n  \
             Hint: Run `vista models download --size {}` first.",
            config.embedding.model_size,
            EmbeddingEngine::model_path(&config.embedding, &model_dir),
            config.embedding.model_size
        );
    }
    Ok(ImageEmbedder::from_config(config)?)
}

/// Create the selected store and check that its server answers.
pub async fn connect_store(
    backend: StoreBackend,
    config: &Config,
) -> anyhow::Result<Box<dyn VectorStore>> {
    let store = VectorStoreFactory::create(backend, &config.store);
    let endpoint = match backend {
        StoreBackend::Milvus => &config.store.milvus.endpoint,
        StoreBackend::Weaviate => &config.store.weaviate.endpoint,
    };
    tracing::info!("Connecting to {} at {}", store.name(), endpoint);
    if !store.is_available().await {
        anyhow::bail!("{}", unreachable_hint(backend, endpoint));
    }
    Ok(store)
}

/// Troubleshooting steps printed when the store cannot be reached.
fn unreachable_hint(backend: StoreBackend, endpoint: &str) -> String {
    let (container, port) = match backend {
        StoreBackend::Milvus => ("milvus", "19530"),
        StoreBackend::Weaviate => ("weaviate", "8080"),
    };
    format!(
        "Could not connect to {backend} at {endpoint}\n\n  \
         Hint: Troubleshooting steps:\n    \
         1. Ensure the {container} container is running: docker ps | grep {container}\n    \
         2. Verify port {port} is mapped in docker-compose.yml\n    \
         3. Check the container logs: docker logs $(docker ps -q --filter name={container})\n    \
         4. Point Vista at another server with --endpoint or `vista config set store.{backend}.endpoint <url>`"
    )
}
