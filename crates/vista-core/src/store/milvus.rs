//! Milvus backend over the v2 REST API.
//!
//! Every Milvus endpoint is a POST that answers `{"code": 0, "data": ...}` on
//! success; a non-zero `code` carries the server's `message`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};

use super::client::RestClient;
use super::provider::{resolve_env_var, CollectionStatus, VectorStore};
use crate::config::{MilvusConfig, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::types::{ImageRecord, Score, SearchHit};

/// Pause between `get_load_state` polls.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct MilvusStore {
    client: RestClient,
    config: MilvusConfig,
    /// How long `search` waits for a collection to finish loading
    load_timeout: Duration,
}

impl MilvusStore {
    pub fn new(store: &StoreConfig) -> Self {
        let config = store.milvus.clone();
        let token = resolve_env_var(&config.token);
        Self {
            client: RestClient::new("milvus", &config.endpoint, token, store),
            config,
            load_timeout: Duration::from_millis(store.request_timeout_ms),
        }
    }

    async fn call(&self, path: &str, body: Value) -> StoreResult<Value> {
        let resp = self.client.post(path, &body).await?;
        check_code(&resp)?;
        Ok(resp.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn has_collection(&self) -> StoreResult<bool> {
        let data = self
            .call(
                "/v2/vectordb/collections/has",
                json!({ "collectionName": self.config.collection }),
            )
            .await?;
        data.get("has")
            .and_then(Value::as_bool)
            .ok_or_else(|| self.client.unexpected("collections/has without a `has` flag"))
    }

    async fn load_state(&self) -> StoreResult<LoadState> {
        let data = self
            .call(
                "/v2/vectordb/collections/get_load_state",
                json!({ "collectionName": self.config.collection }),
            )
            .await?;
        parse_load_state(&data).map_err(|m| self.client.unexpected(m))
    }

    /// Load the collection into memory and wait until it is searchable.
    ///
    /// `collections/load` only schedules the load, so the state is polled
    /// until it reports loaded or `load_timeout` runs out.
    async fn load(&self) -> StoreResult<()> {
        if self.load_state().await? == LoadState::Loaded {
            return Ok(());
        }

        self.call(
            "/v2/vectordb/collections/load",
            json!({ "collectionName": self.config.collection }),
        )
        .await?;

        let deadline = Instant::now() + self.load_timeout;
        loop {
            let state = self.load_state().await?;
            if state == LoadState::Loaded {
                tracing::debug!("Collection {} loaded", self.config.collection);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StoreError::Api {
                    backend: "milvus".to_string(),
                    message: format!(
                        "collection {} still {:?} after {} ms",
                        self.config.collection,
                        state,
                        self.load_timeout.as_millis()
                    ),
                });
            }
            sleep(LOAD_POLL_INTERVAL).await;
        }
    }
}

/// Collection load state as reported by `collections/get_load_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadState {
    Loaded,
    Loading,
    NotLoaded,
}

pub(crate) fn parse_load_state(data: &Value) -> Result<LoadState, String> {
    match data.get("loadState").and_then(Value::as_str) {
        Some("LoadStateLoaded") => Ok(LoadState::Loaded),
        Some("LoadStateLoading") => Ok(LoadState::Loading),
        Some("LoadStateNotLoad") | Some("LoadStateNotExist") => Ok(LoadState::NotLoaded),
        Some(other) => Err(format!("unknown load state {other}")),
        None => Err("get_load_state without a `loadState`".to_string()),
    }
}

/// Turn a non-zero Milvus `code` into `StoreError::Api`.
fn check_code(resp: &Value) -> StoreResult<()> {
    let code = resp.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let message = resp
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(StoreError::Api {
        backend: "milvus".to_string(),
        message: format!("{message} (code {code})"),
    })
}

/// Body for `collections/create`: schema plus the HNSW/COSINE index.
pub(crate) fn create_collection_body(config: &MilvusConfig, dimension: usize) -> Value {
    json!({
        "collectionName": config.collection,
        "schema": {
            "autoId": true,
            "enableDynamicField": false,
            "fields": [
                {
                    "fieldName": "id",
                    "dataType": "Int64",
                    "isPrimary": true
                },
                {
                    "fieldName": "image_path",
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": config.max_path_length }
                },
                {
                    "fieldName": "embedding",
                    "dataType": "FloatVector",
                    "elementTypeParams": { "dim": dimension }
                }
            ]
        },
        "indexParams": [
            {
                "fieldName": "embedding",
                "indexName": "embedding_index",
                "metricType": "COSINE",
                "indexType": "HNSW",
                "params": {
                    "M": config.hnsw_m,
                    "efConstruction": config.hnsw_ef_construction
                }
            }
        ]
    })
}

/// Body for `entities/insert`. Milvus keeps the full path as discovered.
pub(crate) fn insert_body(collection: &str, records: &[ImageRecord]) -> Value {
    let rows: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "image_path": r.path.to_string_lossy(),
                "embedding": r.embedding,
            })
        })
        .collect();
    json!({ "collectionName": collection, "data": rows })
}

/// Body for `entities/search`.
pub(crate) fn search_body(config: &MilvusConfig, vector: &[f32], limit: usize) -> Value {
    json!({
        "collectionName": config.collection,
        "data": [vector],
        "annsField": "embedding",
        "limit": limit,
        "outputFields": ["image_path"],
        "searchParams": {
            "metricType": "COSINE",
            "params": { "ef": config.search_ef }
        }
    })
}

/// Parse the `data` of a search response into hits.
///
/// Servers answer either a flat list of hits or one list per query vector;
/// both shapes are accepted.
pub(crate) fn parse_search_data(data: &Value) -> Result<Vec<SearchHit>, String> {
    let items = data
        .as_array()
        .ok_or_else(|| "search data is not an array".to_string())?;
    let hits = match items.first() {
        Some(Value::Array(inner)) => inner.as_slice(),
        _ => items.as_slice(),
    };

    hits.iter()
        .map(|hit| {
            let path = hit
                .get("image_path")
                .or_else(|| hit.get("entity").and_then(|e| e.get("image_path")))
                .and_then(Value::as_str)
                .ok_or_else(|| "search hit without image_path".to_string())?;
            let distance = hit
                .get("distance")
                .and_then(Value::as_f64)
                .ok_or_else(|| "search hit without distance".to_string())?;
            Ok(SearchHit {
                filename: file_name_of(path),
                path: path.to_string(),
                score: Score::Distance(distance as f32),
                metadata: None,
            })
        })
        .collect()
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[async_trait]
impl VectorStore for MilvusStore {
    fn name(&self) -> &str {
        self.client.backend()
    }

    async fn is_available(&self) -> bool {
        self.has_collection().await.is_ok()
    }

    async fn ensure_collection(&self, dimension: usize) -> StoreResult<CollectionStatus> {
        if self.has_collection().await? {
            tracing::debug!("Collection {} already exists", self.config.collection);
            return Ok(CollectionStatus::Existing);
        }

        self.call(
            "/v2/vectordb/collections/create",
            create_collection_body(&self.config, dimension),
        )
        .await?;
        tracing::info!(
            "Created collection {} (dim {}, HNSW M={} efConstruction={})",
            self.config.collection,
            dimension,
            self.config.hnsw_m,
            self.config.hnsw_ef_construction
        );
        Ok(CollectionStatus::Created)
    }

    async fn insert(&self, records: &[ImageRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            tracing::info!("No embeddings to insert");
            return Ok(0);
        }

        let data = self
            .call(
                "/v2/vectordb/entities/insert",
                insert_body(&self.config.collection, records),
            )
            .await?;
        let inserted = data
            .get("insertCount")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(records.len());
        tracing::debug!("Inserted {} entities into {}", inserted, self.config.collection);
        Ok(inserted)
    }

    async fn flush(&self) -> StoreResult<()> {
        self.call(
            "/v2/vectordb/collections/flush",
            json!({ "collectionName": self.config.collection }),
        )
        .await?;
        tracing::debug!("Flushed collection {}", self.config.collection);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> StoreResult<Vec<SearchHit>> {
        if let Err(e) = self.load().await {
            tracing::warn!("Could not load collection {}: {}", self.config.collection, e);
        }

        let data = self
            .call(
                "/v2/vectordb/entities/search",
                search_body(&self.config, vector, limit),
            )
            .await?;
        parse_search_data(&data).map_err(|m| self.client.unexpected(m))
    }

    fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    async fn close(&self) {
        let result = self
            .call(
                "/v2/vectordb/collections/release",
                json!({ "collectionName": self.config.collection }),
            )
            .await;
        if let Err(e) = result {
            tracing::warn!("Failed to release collection {}: {}", self.config.collection, e);
        }
    }
}
