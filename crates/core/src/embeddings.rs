//! Embedding generation through an Azure OpenAI deployment.

use crate::auth::Credential;
use crate::config::EmbeddingServiceConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const BACKEND: &str = "azure-openai";

#[async_trait]
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

/// Calls `/openai/deployments/{deployment}/embeddings` once per text.
pub struct AzureOpenAiEmbedder {
    client: Client,
    url: String,
    credential: Credential,
}

impl AzureOpenAiEmbedder {
    pub fn new(config: &EmbeddingServiceConfig, credential: Credential) -> Self {
        Self {
            client: Client::new(),
            url: embeddings_url(config),
            credential,
        }
    }
}

fn embeddings_url(config: &EmbeddingServiceConfig) -> String {
    format!(
        "{}/openai/deployments/{}/embeddings?api-version={}",
        config.endpoint.trim_end_matches('/'),
        config.deployment,
        config.api_version
    )
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
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

/// Pulls `error.message` out of an Azure error body, or returns the body as is.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body)
}

/// Error for a non-2xx reply from an Azure REST endpoint.
pub(crate) fn status_error(backend: &str, status: StatusCode, body: String) -> SearchError {
    SearchError::BackendResponse {
        backend: backend.to_string(),
        details: format!("{status}: {}", error_detail(body)),
    }
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, SearchError> {
    response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .filter(|embedding| !embedding.is_empty())
        .ok_or_else(|| SearchError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "response contained no embedding".to_string(),
        })
}

#[async_trait]
impl Embedder for AzureOpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        debug!(backend = BACKEND, text_len = text.len(), "embedding text");

        let response = self
            .credential
            .apply(self.client.post(&self.url))
            .json(&EmbeddingRequest { input: text })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "embedding request rejected");
            return Err(status_error(BACKEND, status, body));
        }

        first_embedding(response.json().await?)
    }
}
