use azure_pdf_search_core::{
    ingest_folder, ingest_pdf_files, resolve_credential, AzureCliIdentity, AzureOpenAiEmbedder,
    AzureSearchStore, IngestionOptions, PdfChunk, QueryMode, SearchCoordinator, SearchResponse,
    SearchStoreOptions, ServiceConfig, COGNITIVE_SERVICES_RESOURCE, SEARCH_RESOURCE,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "azure-pdf-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Azure AI Search REST API version
    #[arg(long, env = "AZURE_SEARCH_API_VERSION", default_value = "2023-11-01")]
    search_api_version: String,

    /// Name of the vector field in the index
    #[arg(long, default_value = "content_vector")]
    vector_field: String,

    /// Semantic configuration used by semantic-hybrid queries
    #[arg(long, default_value = "default")]
    semantic_configuration: String,

    /// Program used to obtain tokens when no key is configured
    #[arg(long, default_value = "az")]
    azure_cli: String,
}

#[derive(Args)]
struct Sources {
    /// PDF file to ingest (repeatable).
    #[arg(long = "file", required_unless_present = "folder", conflicts_with = "folder")]
    files: Vec<PathBuf>,

    /// Folder that contains PDFs recursively.
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Characters per chunk.
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, default_value = "0")]
    chunk_overlap: usize,
}

impl Sources {
    fn load(&self) -> anyhow::Result<Vec<PdfChunk>> {
        let options = IngestionOptions {
            chunk_max_chars: self.chunk_size,
            chunk_overlap_chars: self.chunk_overlap,
        };

        let chunks = match &self.folder {
            Some(folder) => ingest_folder(folder, &options)?,
            None => ingest_pdf_files(&self.files, &options)?,
        };
        Ok(chunks)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Chunk PDFs, embed each chunk, and upload it to the search index.
    Ingest {
        #[command(flatten)]
        sources: Sources,
    },
    /// Query the index.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// similarity, hybrid or semantic-hybrid
        #[arg(long, default_value = "hybrid")]
        mode: QueryMode,
        /// Number of results to return.
        #[arg(long, default_value = "4")]
        top_k: usize,
    },
    /// Ingest, then run the query in every mode.
    Demo {
        #[command(flatten)]
        sources: Sources,
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "4")]
        top_k: usize,
    },
}

type Coordinator = SearchCoordinator<AzureOpenAiEmbedder, AzureSearchStore>;

async fn connect(cli: &Cli) -> anyhow::Result<Coordinator> {
    let config = ServiceConfig::from_env()?;
    let identity = AzureCliIdentity {
        program: cli.azure_cli.clone(),
    };

    let search_credential =
        resolve_credential(config.search.admin_key.as_deref(), SEARCH_RESOURCE, &identity).await?;
    let embedding_credential = resolve_credential(
        config.embedding.api_key.as_deref(),
        COGNITIVE_SERVICES_RESOURCE,
        &identity,
    )
    .await?;

    let embedder = AzureOpenAiEmbedder::new(&config.embedding, embedding_credential);
    let store = AzureSearchStore::new(
        &config.search.endpoint,
        &config.search.index_name,
        search_credential,
        SearchStoreOptions {
            api_version: cli.search_api_version.clone(),
            vector_field: cli.vector_field.clone(),
            semantic_configuration: cli.semantic_configuration.clone(),
        },
    );

    info!(
        search_endpoint = %config.search.endpoint,
        index = %config.search.index_name,
        deployment = %config.embedding.deployment,
        "connected clients"
    );
    Ok(SearchCoordinator::new(embedder, store))
}

/// Reads and chunks the PDFs a command needs, before anything remote runs.
fn local_chunks(command: &Command) -> anyhow::Result<Vec<PdfChunk>> {
    match command {
        Command::Ingest { sources } | Command::Demo { sources, .. } => sources.load(),
        Command::Search { .. } => Ok(Vec::new()),
    }
}

async fn ingest(coordinator: &Coordinator, chunks: &[PdfChunk]) -> anyhow::Result<()> {
    info!(chunk_count = chunks.len(), "ingesting chunks");

    let report = coordinator.index_chunks(chunks).await?;
    println!(
        "{} chunks indexed (dimensions={}) at {}",
        report.written,
        report.dimensions,
        Utc::now().to_rfc3339()
    );
    Ok(())
}

fn print_response(response: &SearchResponse) {
    println!("query: {} (mode={})", response.query, response.mode);

    for answer in &response.answers {
        println!("answer: score={:.4} key={}", answer.score, answer.key);
        println!("  {}", answer.highlights.as_deref().unwrap_or(&answer.text));
    }

    if response.results.is_empty() {
        println!("no results");
    }

    for (rank, hit) in response.results.iter().enumerate() {
        let reranker = hit
            .reranker_score
            .map(|score| format!(" reranker={score:.4}"))
            .unwrap_or_default();
        let page = hit.page.map(|page| format!(" page={page}")).unwrap_or_default();
        println!(
            "[{}] score={:.4}{} source={}{}",
            rank + 1,
            hit.score,
            reranker,
            hit.source_path,
            page
        );
        for caption in &hit.captions {
            println!("  caption: {}", caption.highlights.as_deref().unwrap_or(&caption.text));
        }
        println!("  content:\n{}", hit.content);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            warn!(%error, "could not read .env file");
        }
    }

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "azure-pdf-search boot"
    );

    let chunks = local_chunks(&cli.command)?;
    let coordinator = connect(&cli).await?;

    match &cli.command {
        Command::Ingest { .. } => ingest(&coordinator, &chunks).await?,
        Command::Search { query, mode, top_k } => {
            let response = coordinator.search(query, *top_k, *mode).await?;
            print_response(&response);
        }
        Command::Demo { query, top_k, .. } => {
            ingest(&coordinator, &chunks).await?;
            let similarity = coordinator.similarity(query, *top_k).await?;
            print_response(&similarity);
            let hybrid = coordinator.hybrid(query, *top_k).await?;
            print_response(&hybrid);
            let semantic = coordinator.semantic_hybrid(query, *top_k).await?;
            print_response(&semantic);
        }
    }

    Ok(())
}
