use crate::error::IngestError;
use crate::models::{IngestionOptions, PdfChunk};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "window size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap ({}) must be smaller than window size ({})",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

/// Splits `text` into windows of at most `window` characters, each starting
/// `window - overlap` characters after the previous one.
pub fn split_text(text: &str, window: usize, overlap: usize) -> Result<Vec<String>, IngestError> {
    ChunkingConfig {
        max_chars: window,
        overlap_chars: overlap,
    }
    .validate()?;

    let chars: Vec<char> = text.chars().collect();
    let step = window - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Chunks one page and returns the chunks plus the next free global index.
pub fn build_chunks(
    source_path: &str,
    page: u32,
    page_text: &str,
    config: ChunkingConfig,
    global_index: u64,
) -> Result<(Vec<PdfChunk>, u64), IngestError> {
    let mut cursor = global_index;
    let mut chunks = Vec::new();

    for text in split_text(page_text, config.max_chars, config.overlap_chars)? {
        chunks.push(PdfChunk {
            chunk_id: make_chunk_id(source_path, page, cursor, &text),
            source_path: source_path.to_string(),
            page,
            chunk_index: cursor,
            text,
        });
        cursor = cursor.saturating_add(1);
    }

    Ok((chunks, cursor))
}

fn make_chunk_id(source_path: &str, page: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
