use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdfChunk {
    pub chunk_id: String,
    pub source_path: String,
    pub page: u32,
    pub chunk_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    Similarity,
    Hybrid,
    SemanticHybrid,
}

impl QueryMode {
    pub const ALL: [QueryMode; 3] = [
        QueryMode::Similarity,
        QueryMode::Hybrid,
        QueryMode::SemanticHybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Similarity => "similarity",
            QueryMode::Hybrid => "hybrid",
            QueryMode::SemanticHybrid => "semantic-hybrid",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        QueryMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("unknown query mode `{value}` (expected similarity, hybrid or semantic-hybrid)")
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub mode: QueryMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Caption {
    pub text: String,
    pub highlights: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticAnswer {
    pub key: String,
    pub text: String,
    pub highlights: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub id: String,
    pub content: String,
    pub source_path: String,
    pub page: Option<u32>,
    pub score: f64,
    pub reranker_score: Option<f64>,
    pub captions: Vec<Caption>,
}

/// Results in the order the search service ranked them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub mode: QueryMode,
    pub answers: Vec<SemanticAnswer>,
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexReport {
    pub written: usize,
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_000,
            chunk_overlap_chars: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QueryMode;

    #[test]
    fn query_mode_parses_its_display_form() {
        for mode in QueryMode::ALL {
            assert_eq!(mode.to_string().parse::<QueryMode>(), Ok(mode));
        }
        assert_eq!("Semantic-Hybrid".parse::<QueryMode>(), Ok(QueryMode::SemanticHybrid));
        assert!("keyword".parse::<QueryMode>().is_err());
    }
}
