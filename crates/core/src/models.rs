use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub source_path: String,
    pub raw_text: String,
    pub normalized_text: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub document_name: String,
    pub source_path: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub text: String,
}

/// Composite chunk id. Stable and unique per (document, index); re-indexing
/// the same pair overwrites the prior record, which keeps rebuilds idempotent.
pub fn chunk_id(document_name: &str, index: usize) -> String {
    format!("{document_name}_chunk_{index}")
}

/// Stored with every embedding record and echoed back on search hits.
/// `extra` carries document-level metadata flattened into the same map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default)]
    pub total_chunks: usize,
    #[serde(default)]
    pub source: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

impl SearchHit {
    /// Display convention for cosine-style normalized distances; the stored
    /// value stays a distance.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub persist_location: String,
}

/// Explicit pipeline configuration, constructed once at process start and
/// passed by reference. `chunk_size: None` defers to the normalizer's
/// default.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: Option<usize>,
    pub embed_batch_size: usize,
    pub source_tag: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            embed_batch_size: 50,
            source_tag: "document".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub file_name: String,
    pub file_path: String,
    pub chunks: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct SkippedBatch {
    pub batch_index: usize,
    pub chunk_count: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub added_chunks: usize,
    pub skipped_batches: Vec<SkippedBatch>,
}

impl IndexReport {
    pub fn succeeded(&self) -> bool {
        self.added_chunks > 0
    }
}

#[derive(Debug, Clone)]
pub struct FileStats {
    pub file_name: String,
    pub chunk_count: usize,
    pub raw_chars: usize,
    pub normalized_chars: usize,
}

impl FileStats {
    pub fn compression_percent(&self) -> f64 {
        if self.raw_chars == 0 {
            return 0.0;
        }
        (self.raw_chars.saturating_sub(self.normalized_chars)) as f64 / self.raw_chars as f64
            * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: std::path::PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusReport {
    pub file_count: usize,
    pub chunk_count: usize,
    pub total_raw_chars: usize,
    pub total_normalized_chars: usize,
    pub file_stats: Vec<FileStats>,
    pub skipped_files: Vec<SkippedFile>,
    pub index: IndexReport,
}

impl CorpusReport {
    pub fn compression_percent(&self) -> f64 {
        if self.total_raw_chars == 0 {
            return 0.0;
        }
        (self.total_raw_chars.saturating_sub(self.total_normalized_chars)) as f64
            / self.total_raw_chars as f64
            * 100.0
    }

    pub fn succeeded(&self) -> bool {
        self.index.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable() {
        assert_eq!(chunk_id("deep_learning", 0), "deep_learning_chunk_0");
        assert_eq!(chunk_id("deep_learning", 12), "deep_learning_chunk_12");
    }

    #[test]
    fn similarity_is_one_minus_distance() {
        let hit = SearchHit {
            document: "text".to_string(),
            metadata: ChunkMetadata::default(),
            distance: 0.25,
        };
        assert!((hit.similarity() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn metadata_serializes_extras_flat() {
        let mut extra = BTreeMap::new();
        extra.insert("file_size".to_string(), Value::from(1024));

        let metadata = ChunkMetadata {
            file_name: "doc".to_string(),
            file_path: "/data/raw/doc.md".to_string(),
            chunk_index: 1,
            total_chunks: 3,
            source: "markdown".to_string(),
            extra,
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["file_name"], "doc");
        assert_eq!(value["file_size"], 1024);
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn compression_percent_handles_empty_corpus() {
        let report = CorpusReport::default();
        assert_eq!(report.compression_percent(), 0.0);
        assert!(!report.succeeded());
    }
}
