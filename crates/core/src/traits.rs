use crate::{PdfChunk, SearchError, SearchQuery, SearchResponse};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex {
    /// Creates the index if it does not exist yet.
    async fn ensure_index(&self, dimensions: usize) -> Result<(), SearchError>;

    async fn upload_chunk(&self, chunk: &PdfChunk, embedding: &[f32]) -> Result<(), SearchError>;

    async fn search(
        &self,
        query: &SearchQuery,
        query_vector: &[f32],
    ) -> Result<SearchResponse, SearchError>;
}
