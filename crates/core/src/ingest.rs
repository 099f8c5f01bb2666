use crate::chunking::{build_chunks, ChunkingConfig};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::{IngestError, IngestionOptions, PdfChunk};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn ingest_folder(folder: &Path, options: &IngestionOptions) -> Result<Vec<PdfChunk>, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    ingest_pdf_files(&files, options)
}

pub fn ingest_pdf_files(paths: &[PathBuf], options: &IngestionOptions) -> Result<Vec<PdfChunk>, IngestError> {
    ingest_pdf_files_with(&LopdfExtractor, paths, options)
}

/// Reads and chunks every file in order. The first unreadable file aborts
/// the whole ingestion.
pub fn ingest_pdf_files_with<X>(
    extractor: &X,
    paths: &[PathBuf],
    options: &IngestionOptions,
) -> Result<Vec<PdfChunk>, IngestError>
where
    X: PdfExtractor,
{
    let config = ChunkingConfig::from(options);
    config.validate()?;

    if paths.is_empty() {
        return Err(IngestError::InvalidArgument("no pdf files given".to_string()));
    }

    let mut result = Vec::new();
    let mut cursor = 0u64;

    for path in paths {
        if path.file_name().is_none() {
            return Err(IngestError::MissingFileName(path.display().to_string()));
        }

        let source_path = path.to_string_lossy().to_string();
        let pages = extractor.extract_pages(path)?;
        let first_chunk = result.len();

        for page in &pages {
            let (page_chunks, next_cursor) =
                build_chunks(&source_path, page.number, &page.text, config, cursor)?;
            cursor = next_cursor;
            result.extend(page_chunks);
        }

        debug!(
            path = %path.display(),
            pages = pages.len(),
            chunks = result.len() - first_chunk,
            "pdf chunked"
        );
    }

    info!(
        files = paths.len(),
        chunk_count = result.len(),
        window = config.max_chars,
        overlap = config.overlap_chars,
        "pdf ingestion finished"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::split_text;
    use crate::extractor::{extract_page_texts, PageText};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedPages(HashMap<PathBuf, Vec<usize>>);

    impl PdfExtractor for FixedPages {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            let lengths = self
                .0
                .get(path)
                .ok_or_else(|| IngestError::PdfParse(format!("unknown file {}", path.display())))?;
            Ok(lengths
                .iter()
                .enumerate()
                .map(|(index, len)| PageText {
                    number: index as u32 + 1,
                    text: "x".repeat(*len),
                })
                .collect())
        }
    }

    fn write_pdf(path: &Path, pages: &[String]) -> Result<(), Box<dyn std::error::Error>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 10.into()]),
                    Operation::new("Td", vec![40.into(), 800.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path)?;
        Ok(())
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        fs::write(base.join("notes.txt"), b"not a pdf")?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn ingestion_fails_without_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = ingest_folder(dir.path(), &IngestionOptions::default());
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn unreadable_pdf_aborts_ingestion() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;

        let result = ingest_folder(dir.path(), &IngestionOptions::default());
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn invalid_window_is_rejected_before_reading_files() {
        let options = IngestionOptions {
            chunk_max_chars: 100,
            chunk_overlap_chars: 100,
        };
        let result = ingest_pdf_files(&[PathBuf::from("/does/not/exist.pdf")], &options);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn three_documents_produce_the_sum_of_their_chunk_counts() {
        let files = HashMap::from([
            (PathBuf::from("/docs/a.pdf"), vec![2_500, 1_000, 10]),
            (PathBuf::from("/docs/b.pdf"), vec![999]),
            (PathBuf::from("/docs/c.pdf"), vec![4_001, 3_000]),
        ]);
        let paths = vec![
            PathBuf::from("/docs/a.pdf"),
            PathBuf::from("/docs/b.pdf"),
            PathBuf::from("/docs/c.pdf"),
        ];

        let chunks = ingest_pdf_files_with(&FixedPages(files), &paths, &IngestionOptions::default())
            .expect("ingestion should succeed");

        // a: 3 + 1 + 1, b: 1, c: 5 + 3
        assert_eq!(chunks.len(), 14);
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 1_000));
        assert_eq!(
            chunks.iter().filter(|chunk| chunk.source_path == "/docs/b.pdf").count(),
            1
        );

        let indices: Vec<u64> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
        assert_eq!(indices, (0..14).collect::<Vec<u64>>());
    }

    #[test]
    fn generated_pdfs_are_chunked_per_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let sentence = "Hybrid search combines keyword and vector scoring. ";
        let layouts: [(&str, usize, usize); 3] =
            [("one.pdf", 1, 60), ("two.pdf", 2, 25), ("three.pdf", 3, 5)];

        let mut paths = Vec::new();
        for (name, page_count, repeats) in layouts {
            let path = dir.path().join(name);
            let pages: Vec<String> = (0..page_count).map(|_| sentence.repeat(repeats)).collect();
            write_pdf(&path, &pages)?;
            paths.push(path);
        }

        let options = IngestionOptions::default();
        let chunks = ingest_pdf_files(&paths, &options)?;

        let mut expected = 0;
        for ((_, page_count, _), path) in layouts.iter().zip(&paths) {
            let pages = extract_page_texts(path)?;
            assert_eq!(pages.len(), *page_count);
            for page in pages {
                expected += split_text(&page.text, 1_000, 0)?.len();
            }
        }

        assert_eq!(chunks.len(), expected);
        assert!(chunks.len() >= 6);
        Ok(())
    }
}
