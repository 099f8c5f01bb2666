use crate::auth::Credential;
use crate::embeddings::status_error;
use crate::traits::VectorIndex;
use crate::{
    Caption, PdfChunk, QueryMode, QueryResult, SearchError, SearchQuery, SearchResponse,
    SemanticAnswer,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

const BACKEND: &str = "azure-search";
const HNSW_ALGORITHM: &str = "default-hnsw";
const VECTOR_PROFILE: &str = "default-vector-profile";

#[derive(Debug, Clone)]
pub struct SearchStoreOptions {
    pub api_version: String,
    pub vector_field: String,
    pub semantic_configuration: String,
}

impl Default for SearchStoreOptions {
    fn default() -> Self {
        Self {
            api_version: "2023-11-01".to_string(),
            vector_field: "content_vector".to_string(),
            semantic_configuration: "default".to_string(),
        }
    }
}

pub struct AzureSearchStore {
    client: Client,
    endpoint: String,
    index_name: String,
    credential: Credential,
    options: SearchStoreOptions,
}

impl AzureSearchStore {
    pub fn new(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        credential: Credential,
        options: SearchStoreOptions,
    ) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            credential,
            options,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/indexes/{}{}?api-version={}",
            self.endpoint, self.index_name, path, self.options.api_version
        )
    }
}

async fn backend_error(response: Response) -> SearchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    status_error(BACKEND, status, body)
}

/// `Some(true)` when the index exists, `Some(false)` when it must be created,
/// `None` for any other answer from the service.
fn index_exists(status: StatusCode) -> Option<bool> {
    match status {
        StatusCode::OK => Some(true),
        StatusCode::NOT_FOUND => Some(false),
        _ => None,
    }
}

/// The first document the service refused in an index batch response.
fn rejected_upload(payload: &Value) -> Option<SearchError> {
    payload
        .pointer("/value")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|item| item.pointer("/status").and_then(Value::as_bool) == Some(false))
        .map(|item| SearchError::BackendResponse {
            backend: BACKEND.to_string(),
            details: format!(
                "document {} rejected: {}",
                string_at(item, "/key"),
                string_at(item, "/errorMessage")
            ),
        })
}

pub fn index_definition(index_name: &str, dimensions: usize, options: &SearchStoreOptions) -> Value {
    json!({
        "name": index_name,
        "fields": [
            {"name": "id", "type": "Edm.String", "key": true, "filterable": true},
            {"name": "content", "type": "Edm.String", "searchable": true},
            {
                "name": options.vector_field,
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "dimensions": dimensions,
                "vectorSearchProfile": VECTOR_PROFILE
            },
            {"name": "metadata", "type": "Edm.String", "searchable": true},
            {"name": "source", "type": "Edm.String", "filterable": true},
            {"name": "page", "type": "Edm.Int32", "filterable": true}
        ],
        "vectorSearch": {
            "algorithms": [
                {
                    "name": HNSW_ALGORITHM,
                    "kind": "hnsw",
                    "hnswParameters": {"m": 4, "efConstruction": 400, "efSearch": 500, "metric": "cosine"}
                }
            ],
            "profiles": [{"name": VECTOR_PROFILE, "algorithm": HNSW_ALGORITHM}]
        },
        "semantic": {
            "configurations": [
                {
                    "name": options.semantic_configuration,
                    "prioritizedFields": {
                        "prioritizedContentFields": [{"fieldName": "content"}]
                    }
                }
            ]
        }
    })
}

pub fn upload_document(chunk: &PdfChunk, embedding: &[f32], options: &SearchStoreOptions) -> Value {
    let metadata = json!({"source": chunk.source_path, "page": chunk.page});
    let mut document = json!({
        "@search.action": "upload",
        "id": chunk.chunk_id,
        "content": chunk.text,
        "metadata": metadata.to_string(),
        "source": chunk.source_path,
        "page": chunk.page,
    });
    document[options.vector_field.as_str()] = json!(embedding);
    json!({ "value": [document] })
}

/// Request body for one query. Only the mode flags differ between modes;
/// ranking stays with the service.
pub fn build_search_body(query: &SearchQuery, query_vector: &[f32], options: &SearchStoreOptions) -> Value {
    let mut body = json!({
        "top": query.top_k,
        "select": "id,content,metadata,source,page",
        "vectorQueries": [
            {
                "kind": "vector",
                "vector": query_vector,
                "k": query.top_k,
                "fields": options.vector_field
            }
        ]
    });

    match query.mode {
        QueryMode::Similarity => {}
        QueryMode::Hybrid => {
            body["search"] = json!(query.text);
        }
        QueryMode::SemanticHybrid => {
            body["search"] = json!(query.text);
            body["queryType"] = json!("semantic");
            body["semanticConfiguration"] = json!(options.semantic_configuration);
            body["captions"] = json!("extractive");
            body["answers"] = json!("extractive|count-3");
        }
    }

    body
}

pub fn parse_search_response(query: &SearchQuery, payload: &Value) -> SearchResponse {
    let answers = payload
        .pointer("/@search.answers")
        .and_then(Value::as_array)
        .map(|answers| {
            answers
                .iter()
                .map(|answer| SemanticAnswer {
                    key: string_at(answer, "/key"),
                    text: string_at(answer, "/text"),
                    highlights: optional_string_at(answer, "/highlights"),
                    score: answer.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                })
                .collect()
        })
        .unwrap_or_default();

    let results = payload
        .pointer("/value")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(parse_hit).collect())
        .unwrap_or_default();

    SearchResponse {
        query: query.text.clone(),
        mode: query.mode,
        answers,
        results,
    }
}

fn parse_hit(hit: &Value) -> QueryResult {
    let metadata: Value = hit
        .pointer("/metadata")
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);

    let source_path = optional_string_at(hit, "/source")
        .or_else(|| optional_string_at(&metadata, "/source"))
        .unwrap_or_default();
    let page = hit
        .pointer("/page")
        .and_then(Value::as_u64)
        .or_else(|| metadata.pointer("/page").and_then(Value::as_u64))
        .and_then(|page| u32::try_from(page).ok());

    let captions = hit
        .pointer("/@search.captions")
        .and_then(Value::as_array)
        .map(|captions| {
            captions
                .iter()
                .map(|caption| Caption {
                    text: string_at(caption, "/text"),
                    highlights: optional_string_at(caption, "/highlights"),
                })
                .collect()
        })
        .unwrap_or_default();

    QueryResult {
        id: string_at(hit, "/id"),
        content: string_at(hit, "/content"),
        source_path,
        page,
        score: hit.pointer("/@search.score").and_then(Value::as_f64).unwrap_or(0.0),
        reranker_score: hit.pointer("/@search.rerankerScore").and_then(Value::as_f64),
        captions,
    }
}

fn optional_string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn string_at(value: &Value, pointer: &str) -> String {
    optional_string_at(value, pointer).unwrap_or_default()
}

#[async_trait]
impl VectorIndex for AzureSearchStore {
    async fn ensure_index(&self, dimensions: usize) -> Result<(), SearchError> {
        let response = self
            .credential
            .apply(self.client.get(self.url("")))
            .send()
            .await?;

        match index_exists(response.status()) {
            Some(true) => {
                debug!(index = %self.index_name, "search index already exists");
                return Ok(());
            }
            Some(false) => {}
            None => return Err(backend_error(response).await),
        }

        let response = self
            .credential
            .apply(self.client.put(self.url("")))
            .json(&index_definition(&self.index_name, dimensions, &self.options))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!(index = %self.index_name, dimensions, "search index created");
        Ok(())
    }

    async fn upload_chunk(&self, chunk: &PdfChunk, embedding: &[f32]) -> Result<(), SearchError> {
        let response = self
            .credential
            .apply(self.client.post(self.url("/docs/index")))
            .json(&upload_document(chunk, embedding, &self.options))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        if let Some(error) = rejected_upload(&parsed) {
            return Err(error);
        }

        debug!(chunk_id = %chunk.chunk_id, "chunk uploaded");
        Ok(())
    }

    async fn search(
        &self,
        query: &SearchQuery,
        query_vector: &[f32],
    ) -> Result<SearchResponse, SearchError> {
        let response = self
            .credential
            .apply(self.client.post(self.url("/docs/search")))
            .json(&build_search_body(query, query_vector, &self.options))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let payload: Value = response.json().await?;
        Ok(parse_search_response(query, &payload))
    }
}
