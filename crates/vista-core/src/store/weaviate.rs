//! Weaviate backend over REST (schema, batch) and GraphQL (search).

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::RestClient;
use super::provider::{resolve_env_var, CollectionStatus, VectorStore};
use crate::config::{StoreConfig, WeaviateConfig};
use crate::error::{StoreError, StoreResult};
use crate::types::{HitMetadata, ImageRecord, Score, SearchHit};

pub struct WeaviateStore {
    client: RestClient,
    config: WeaviateConfig,
}

impl WeaviateStore {
    pub fn new(store: &StoreConfig) -> Self {
        let config = store.weaviate.clone();
        let api_key = resolve_env_var(&config.api_key);
        Self {
            client: RestClient::new("weaviate", &config.endpoint, api_key, store),
            config,
        }
    }
}

/// Class definition posted to `/v1/schema`.
pub(crate) fn class_definition(config: &WeaviateConfig) -> Value {
    json!({
        "class": config.class_name,
        "vectorizer": "none",
        "vectorIndexType": "hnsw",
        "vectorIndexConfig": {
            "ef": config.ef,
            "efConstruction": config.ef_construction,
            "maxConnections": config.max_connections,
            "vectorCacheMaxObjects": config.vector_cache_max_objects
        },
        "properties": [
            { "name": "filename", "dataType": ["text"] },
            { "name": "path", "dataType": ["text"] },
            {
                "name": "metadata",
                "dataType": ["object"],
                "nestedProperties": [
                    { "name": "width", "dataType": ["int"] },
                    { "name": "height", "dataType": ["int"] },
                    { "name": "format", "dataType": ["text"] },
                    { "name": "size_kb", "dataType": ["number"] }
                ]
            }
        ]
    })
}

/// True when the `/v1/schema` response lists `class_name`.
pub(crate) fn schema_has_class(schema: &Value, class_name: &str) -> bool {
    schema
        .get("classes")
        .and_then(Value::as_array)
        .map(|classes| {
            classes
                .iter()
                .any(|c| c.get("class").and_then(Value::as_str) == Some(class_name))
        })
        .unwrap_or(false)
}

/// Body for `/v1/batch/objects`. Weaviate keeps the root-relative path.
pub(crate) fn batch_body(class_name: &str, records: &[ImageRecord]) -> Value {
    let objects: Vec<Value> = records
        .iter()
        .map(|r| {
            let mut properties = json!({
                "filename": r.filename,
                "path": r.relative_path.to_string_lossy(),
            });
            if let Some(meta) = &r.metadata {
                properties["metadata"] = json!({
                    "width": meta.width,
                    "height": meta.height,
                    "format": meta.format,
                    "size_kb": meta.size_kb,
                });
            }
            json!({
                "class": class_name,
                "properties": properties,
                "vector": r.embedding,
            })
        })
        .collect();
    json!({ "objects": objects })
}

/// Count accepted objects in a batch response, logging per-object errors.
pub(crate) fn count_batch_successes(resp: &Value) -> usize {
    let Some(items) = resp.as_array() else {
        return 0;
    };
    items
        .iter()
        .filter(|item| {
            let errors = item
                .pointer("/result/errors/error")
                .and_then(Value::as_array)
                .filter(|errs| !errs.is_empty());
            match errors {
                Some(errs) => {
                    let path = item
                        .pointer("/properties/path")
                        .and_then(Value::as_str)
                        .unwrap_or("<unknown>");
                    for err in errs {
                        let message = err
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error");
                        tracing::warn!("Weaviate rejected {}: {}", path, message);
                    }
                    false
                }
                None => true,
            }
        })
        .count()
}

/// GraphQL `nearVector` query for the configured class.
pub(crate) fn near_vector_query(class_name: &str, vector: &[f32], limit: usize) -> String {
    let vector_json = serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{{ Get {{ {class_name}(nearVector: {{vector: {vector_json}}}, limit: {limit}) \
         {{ filename path metadata {{ width height format size_kb }} \
         _additional {{ certainty distance }} }} }} }}"
    )
}

/// Parse a GraphQL search response into hits.
pub(crate) fn parse_graphql_hits(resp: &Value, class_name: &str) -> StoreResult<Vec<SearchHit>> {
    if let Some(errors) = resp.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(StoreError::Api {
                backend: "weaviate".to_string(),
                message: messages.join("; "),
            });
        }
    }

    let Some(items) = resp
        .get("data")
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(class_name))
        .and_then(Value::as_array)
    else {
        return Err(StoreError::Response {
            backend: "weaviate".to_string(),
            message: format!("no data.Get.{class_name} in GraphQL response"),
        });
    };

    Ok(items
        .iter()
        .map(|item| {
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let certainty = item
                .pointer("/_additional/certainty")
                .and_then(Value::as_f64)
                .map(|c| c as f32);
            SearchHit {
                filename: text("filename"),
                path: text("path"),
                score: Score::Certainty(certainty),
                metadata: item.get("metadata").and_then(parse_metadata),
            }
        })
        .collect())
}

/// Read whichever metadata fields are present; `None` when there are none.
fn parse_metadata(value: &Value) -> Option<HitMetadata> {
    let dimension = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    let meta = HitMetadata {
        width: dimension("width"),
        height: dimension("height"),
        format: value.get("format").and_then(Value::as_str).map(str::to_string),
        size_kb: value.get("size_kb").and_then(Value::as_f64),
    };
    (!meta.is_empty()).then_some(meta)
}

#[async_trait]
impl VectorStore for WeaviateStore {
    fn name(&self) -> &str {
        self.client.backend()
    }

    async fn is_available(&self) -> bool {
        self.client.ping("/v1/.well-known/ready").await
    }

    async fn ensure_collection(&self, _dimension: usize) -> StoreResult<CollectionStatus> {
        let schema = self.client.get("/v1/schema").await?;
        if schema_has_class(&schema, &self.config.class_name) {
            tracing::debug!("Class {} already exists", self.config.class_name);
            return Ok(CollectionStatus::Existing);
        }

        self.client
            .post("/v1/schema", &class_definition(&self.config))
            .await?;
        tracing::info!("Created schema for class {}", self.config.class_name);
        Ok(CollectionStatus::Created)
    }

    async fn insert(&self, records: &[ImageRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            tracing::info!("No embeddings to insert");
            return Ok(0);
        }

        let resp = self
            .client
            .post(
                "/v1/batch/objects",
                &batch_body(&self.config.class_name, records),
            )
            .await?;
        let inserted = count_batch_successes(&resp);
        tracing::debug!("Weaviate accepted {}/{} objects", inserted, records.len());
        Ok(inserted)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> StoreResult<Vec<SearchHit>> {
        let query = near_vector_query(&self.config.class_name, vector, limit);
        let resp = self
            .client
            .post("/v1/graphql", &json!({ "query": query }))
            .await?;
        parse_graphql_hits(&resp, &self.config.class_name)
    }

    fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    async fn close(&self) {
        // Stateless over HTTP; nothing is held server-side.
        tracing::debug!("Closed Weaviate client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMetadata;
    use std::path::PathBuf;

    fn record(with_metadata: bool) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from("/photos/pets/cat.jpg"),
            relative_path: PathBuf::from("pets/cat.jpg"),
            filename: "cat.jpg".into(),
            embedding: vec![1.0, 0.0],
            metadata: with_metadata.then(|| ImageMetadata {
                width: 640,
                height: 480,
                format: "jpeg".into(),
                size_kb: 12.5,
            }),
        }
    }

    #[test]
    fn test_class_definition() {
        let def = class_definition(&WeaviateConfig::default());
        assert_eq!(def["class"], "Image");
        assert_eq!(def["vectorizer"], "none");
        assert_eq!(def["vectorIndexType"], "hnsw");
        assert_eq!(def["vectorIndexConfig"]["ef"], 200);
        assert_eq!(def["vectorIndexConfig"]["efConstruction"], 128);
        assert_eq!(def["vectorIndexConfig"]["maxConnections"], 16);
        assert_eq!(def["vectorIndexConfig"]["vectorCacheMaxObjects"], 1_000_000);
        let props = def["properties"].as_array().unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props[2]["nestedProperties"][3]["name"], "size_kb");
    }

    #[test]
    fn test_schema_has_class() {
        let schema = json!({ "classes": [{ "class": "Other" }, { "class": "Image" }] });
        assert!(schema_has_class(&schema, "Image"));
        assert!(!schema_has_class(&schema, "Photo"));
        assert!(!schema_has_class(&json!({}), "Image"));
    }

    #[test]
    fn test_batch_body_uses_relative_path() {
        let body = batch_body("Image", &[record(true), record(false)]);
        let objects = body["objects"].as_array().unwrap();
        assert_eq!(objects[0]["class"], "Image");
        assert_eq!(objects[0]["properties"]["path"], "pets/cat.jpg");
        assert_eq!(objects[0]["properties"]["metadata"]["width"], 640);
        assert!(objects[1]["properties"].get("metadata").is_none());
        assert_eq!(objects[0]["vector"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_count_batch_successes_skips_errors() {
        let resp = json!([
            { "result": {} },
            { "properties": { "path": "b.jpg" },
              "result": { "errors": { "error": [{ "message": "bad vector" }] } } },
            { "result": { "errors": { "error": [] } } }
        ]);
        assert_eq!(count_batch_successes(&resp), 2);
        assert_eq!(count_batch_successes(&json!({})), 0);
    }

    #[test]
    fn test_near_vector_query() {
        let q = near_vector_query("Image", &[0.5, 0.25], 5);
        assert!(q.contains("Image(nearVector: {vector: [0.5,0.25]}, limit: 5)"));
        assert!(q.contains("_additional { certainty distance }"));
        assert!(q.contains("metadata { width height format size_kb }"));
    }

    #[test]
    fn test_parse_graphql_hits() {
        let resp = json!({
            "data": { "Get": { "Image": [
                {
                    "filename": "cat.jpg",
                    "path": "pets/cat.jpg",
                    "metadata": { "width": 640, "height": 480, "format": "jpeg", "size_kb": 12.5 },
                    "_additional": { "certainty": 0.5, "distance": 1.0 }
                },
                { "filename": "dog.jpg", "path": "dog.jpg", "metadata": null, "_additional": {} }
            ] } }
        });
        let hits = parse_graphql_hits(&resp, "Image").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, Score::Certainty(Some(0.5)));
        assert_eq!(hits[0].metadata.as_ref().unwrap().width, Some(640));
        assert_eq!(hits[1].score, Score::Certainty(None));
        assert!(hits[1].metadata.is_none());
    }

    #[test]
    fn test_parse_partial_metadata() {
        let meta = parse_metadata(&json!({ "width": 640, "format": "png", "size_kb": null }))
            .unwrap();
        assert_eq!(meta.width, Some(640));
        assert_eq!(meta.height, None);
        assert_eq!(meta.format.as_deref(), Some("png"));
        assert_eq!(meta.size_kb, None);

        assert!(parse_metadata(&json!({})).is_none());
        assert!(parse_metadata(&Value::Null).is_none());
    }

    #[test]
    fn test_parse_graphql_errors() {
        let resp = json!({ "errors": [{ "message": "Cannot query field" }] });
        let err = parse_graphql_hits(&resp, "Image").unwrap_err();
        assert!(matches!(err, StoreError::Api { .. }));

        let err = parse_graphql_hits(&json!({ "data": {} }), "Image").unwrap_err();
        assert!(matches!(err, StoreError::Response { .. }));
    }
}
