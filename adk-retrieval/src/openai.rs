//! OpenAI embedding provider.
//!
//! Only available with the `openai` feature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const PROVIDER: &str = "OpenAI";

/// An [`EmbeddingProvider`] calling the OpenAI `/embeddings` endpoint.
///
/// Defaults to `text-embedding-3-small` with 1536 dimensions. The API key is
/// taken from the constructor or from `OPENAI_API_KEY` via [`from_env`](Self::from_env).
///
/// # Example
///
/// ```rust,ignore
/// use adk_retrieval::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_model("text-embedding-3-large");
/// let vectors = provider.embed_documents(&["first", "second"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the default model. Fails on an empty key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(provider_error("API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| provider_error("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Use a different embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at an OpenAI-compatible endpoint (without the `/embeddings` suffix).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Request truncated embeddings of `dims` length from the API.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

fn provider_error(message: impl Into<String>) -> RetrievalError {
    RetrievalError::Embedding { provider: PROVIDER.to_string(), message: message.into() }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Order response rows by their `index` and check one row came back per input.
fn into_ordered_vectors(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(provider_error(format!(
            "expected {expected} embeddings, API returned {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text])
            .await?
            .pop()
            .ok_or_else(|| provider_error("API returned empty response"))
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                provider_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&raw).map(|e| e.error.message).unwrap_or(raw);
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(provider_error(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "malformed embedding response");
            provider_error(format!("failed to parse response: {e}"))
        })?;

        into_ordered_vectors(parsed.data, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_api_key() {
        assert!(OpenAIEmbeddingProvider::new("  ").is_err());
    }

    #[test]
    fn response_rows_are_reordered_by_index() {
        let data = vec![
            EmbeddingData { index: 1, embedding: vec![2.0] },
            EmbeddingData { index: 0, embedding: vec![1.0] },
        ];
        let vectors = into_ordered_vectors(data, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn short_response_is_a_provider_error() {
        let data = vec![EmbeddingData { index: 0, embedding: vec![1.0] }];
        let err = into_ordered_vectors(data, 3).unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding { .. }));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }
}
