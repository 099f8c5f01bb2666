use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{IndexReport, PdfChunk, QueryMode, SearchError, SearchQuery, SearchResponse};
use tracing::info;

/// Drives the embedding service and the index one request at a time.
pub struct SearchCoordinator<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    embedder: E,
    index: V,
}

impl<E, V> SearchCoordinator<E, V>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(embedder: E, index: V) -> Self {
        Self { embedder, index }
    }

    /// Embeds and uploads every chunk in order. The index is created from the
    /// first embedding's length; the first failure ends the run.
    pub async fn index_chunks(&self, chunks: &[PdfChunk]) -> Result<IndexReport, SearchError> {
        let mut report = IndexReport::default();

        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.text).await?;

            if report.written == 0 {
                report.dimensions = embedding.len();
                self.index.ensure_index(report.dimensions).await?;
            } else if embedding.len() != report.dimensions {
                return Err(SearchError::BackendResponse {
                    backend: "embedder".to_string(),
                    details: format!(
                        "embedding dimension {} != {} for chunk {}",
                        embedding.len(),
                        report.dimensions,
                        chunk.chunk_id
                    ),
                });
            }

            self.index.upload_chunk(chunk, &embedding).await?;
            report.written += 1;
        }

        info!(written = report.written, dimensions = report.dimensions, "chunks indexed");
        Ok(report)
    }

    pub async fn similarity(&self, text: &str, top_k: usize) -> Result<SearchResponse, SearchError> {
        self.search(text, top_k, QueryMode::Similarity).await
    }

    pub async fn hybrid(&self, text: &str, top_k: usize) -> Result<SearchResponse, SearchError> {
        self.search(text, top_k, QueryMode::Hybrid).await
    }

    pub async fn semantic_hybrid(&self, text: &str, top_k: usize) -> Result<SearchResponse, SearchError> {
        self.search(text, top_k, QueryMode::SemanticHybrid).await
    }

    pub async fn search(
        &self,
        text: &str,
        top_k: usize,
        mode: QueryMode,
    ) -> Result<SearchResponse, SearchError> {
        if text.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }
        if top_k == 0 {
            return Err(SearchError::Request("top_k must be greater than zero".to_string()));
        }

        let query = SearchQuery {
            text: text.to_string(),
            top_k,
            mode,
        };
        let query_vector = self.embedder.embed(&query.text).await?;
        let response = self.index.search(&query, &query_vector).await?;

        info!(
            mode = %mode,
            top_k,
            returned = response.results.len(),
            "search finished"
        );
        Ok(response)
    }
}
