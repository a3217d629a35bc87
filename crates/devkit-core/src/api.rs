use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::{DevkitError, Result};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub num_predict: u32,
    pub temperature: f64,
}

/// The three inference-server endpoints the toolkit consumes. Responses are
/// returned as raw JSON; callers pick the fields they need and substitute
/// defaults for the rest.
#[allow(async_fn_in_trait)]
pub trait InferenceApi {
    /// `GET /tags`: installed models.
    async fn tags(&self) -> Result<Value>;

    /// `POST /show {name}`: metadata for one model.
    async fn show(&self, name: &str) -> Result<Value>;

    /// `POST /generate`: one non-streaming completion.
    async fn generate(&self, req: &GenerateRequest) -> Result<Value>;
}

/// HTTP client for an Ollama-compatible server.
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:11434/api`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

async fn json_body(resp: Response) -> Result<Value> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(DevkitError::Api { status, body });
    }
    Ok(resp.json().await?)
}

impl InferenceApi for OllamaClient {
    async fn tags(&self) -> Result<Value> {
        let resp = self.http.get(self.url("tags")).send().await?;
        json_body(resp).await
    }

    async fn show(&self, name: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url("show"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        json_body(resp).await
    }

    async fn generate(&self, req: &GenerateRequest) -> Result<Value> {
        let resp = self.http.post(self.url("generate")).json(req).send().await?;
        json_body(resp).await
    }
}
