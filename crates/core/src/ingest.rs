use crate::chunking::split_into_chunks;
use crate::error::IngestError;
use crate::models::{FileStats, ProcessedDocument, SkippedFile, SourceDocument};
use crate::normalize::TextNormalizer;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Recursively lists the corpus files under `folder`, filtered to the
/// supported extensions and sorted for deterministic processing order.
pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Reads one corpus file into a normalized [`SourceDocument`]. The file stem
/// is the document's stable identifier.
pub fn read_source_document(
    path: &Path,
    normalizer: &dyn TextNormalizer,
) -> Result<SourceDocument, IngestError> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing file stem: {}", path.display()))
        })?
        .to_string();

    let bytes = fs::read(path)?;
    let raw_text = String::from_utf8_lossy(&bytes).to_string();

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let checksum = format!("{:x}", hasher.finalize());

    let normalized_text = normalizer.normalize(&raw_text);

    Ok(SourceDocument {
        name,
        source_path: path.to_string_lossy().to_string(),
        raw_text,
        normalized_text,
        checksum,
        ingested_at: Utc::now(),
    })
}

pub struct CorpusIngest {
    pub documents: Vec<ProcessedDocument>,
    pub file_stats: Vec<FileStats>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Normalizes and chunks every supported file under `folder`, best effort:
/// an unreadable file is recorded as skipped and the rest of the corpus
/// still goes through. Fails only when the folder has no corpus files at
/// all.
pub fn process_folder(
    folder: &Path,
    normalizer: &dyn TextNormalizer,
    chunk_size: Option<usize>,
) -> Result<CorpusIngest, IngestError> {
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(IngestError::EmptyCorpus(folder.display().to_string()));
    }

    let max_chunk_size = chunk_size.unwrap_or_else(|| normalizer.default_chunk_size());

    let mut documents = Vec::new();
    let mut file_stats = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        let document = match read_source_document(&path, normalizer) {
            Ok(document) => document,
            Err(error) => {
                skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        let chunks = split_into_chunks(&document.normalized_text, max_chunk_size);
        let raw_chars = document.raw_text.chars().count();
        let normalized_chars = document.normalized_text.chars().count();

        let mut metadata = BTreeMap::new();
        metadata.insert("file_size".to_string(), serde_json::Value::from(raw_chars));
        metadata.insert(
            "preprocessed_size".to_string(),
            serde_json::Value::from(normalized_chars),
        );
        metadata.insert(
            "checksum".to_string(),
            serde_json::Value::from(document.checksum.clone()),
        );

        file_stats.push(FileStats {
            file_name: document.name.clone(),
            chunk_count: chunks.len(),
            raw_chars,
            normalized_chars,
        });

        documents.push(ProcessedDocument {
            file_name: document.name,
            file_path: document.source_path,
            chunks,
            metadata,
        });
    }

    Ok(CorpusIngest {
        documents,
        file_stats,
        skipped_files,
    })
}
