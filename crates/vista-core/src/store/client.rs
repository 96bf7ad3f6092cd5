//! JSON-over-HTTP plumbing shared by the Milvus and Weaviate backends.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use super::retry::{backoff_duration, is_retryable};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// A small REST client bound to one server and backend name.
pub(crate) struct RestClient {
    backend: &'static str,
    base_url: String,
    bearer: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl RestClient {
    pub fn new(
        backend: &'static str,
        endpoint: &str,
        bearer: Option<String>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            backend,
            base_url: endpoint.trim_end_matches('/').to_string(),
            bearer,
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and return the JSON body.
    pub async fn get(&self, path: &str) -> StoreResult<Value> {
        self.request(Method::GET, path, None).await
    }

    /// POST `body` to `path` and return the JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> StoreResult<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// GET `path` with a short timeout and no retries; true on any 2xx.
    pub async fn ping(&self, path: &str) -> bool {
        let mut request = self
            .client
            .get(self.url(path))
            .timeout(Duration::from_secs(5));
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> StoreResult<Value> {
        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), path, body).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry_attempts && is_retryable(&e) => {
                    let delay = backoff_duration(attempt, self.retry_delay_ms);
                    tracing::warn!(
                        "{} {} failed (attempt {}/{}): {}; retrying in {:?}",
                        method,
                        path,
                        attempt + 1,
                        self.retry_attempts + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> StoreResult<Value> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .timeout(self.timeout);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| StoreError::Connection {
            backend: self.backend.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                backend: self.backend.to_string(),
                status_code: status.as_u16(),
                message: text,
            });
        }

        let text = resp.text().await.map_err(|e| StoreError::Connection {
            backend: self.backend.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Response {
            backend: self.backend.to_string(),
            message: format!("invalid JSON ({e})"),
        })
    }

    /// Build a `StoreError::Response` for this backend.
    pub fn unexpected(&self, message: impl Into<String>) -> StoreError {
        StoreError::Response {
            backend: self.backend.to_string(),
            message: message.into(),
        }
    }
}
