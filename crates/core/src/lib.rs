pub mod auth;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use auth::{
    resolve_credential, AmbientIdentity, AzureCliIdentity, Credential,
    COGNITIVE_SERVICES_RESOURCE, SEARCH_RESOURCE,
};
pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use config::{EmbeddingServiceConfig, SearchServiceConfig, ServiceConfig};
pub use embeddings::{AzureOpenAiEmbedder, Embedder};
pub use error::{ConfigError, IngestError, SearchError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, ingest_folder, ingest_pdf_files, ingest_pdf_files_with};
pub use models::{
    Caption, IndexReport, IngestionOptions, PdfChunk, QueryMode, QueryResult, SearchQuery,
    SearchResponse, SemanticAnswer,
};
pub use orchestrator::SearchCoordinator;
pub use stores::{AzureSearchStore, SearchStoreOptions};
pub use traits::VectorIndex;
