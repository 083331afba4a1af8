use crate::embeddings::EmbeddingProvider;
use crate::error::{PipelineError, RetrievalError};
use crate::ingest::process_folder;
use crate::models::{CollectionInfo, CorpusReport, PipelineOptions, SearchHit};
use crate::normalize::TextNormalizer;
use crate::retrieval::EmbeddingIndex;
use crate::traits::VectorIndex;
use std::path::{Path, PathBuf};

/// Drives normalize, chunk, embed, and index over a corpus folder. One
/// orchestrator serves both processing modes; the normalization strategy is
/// plugged in rather than baked into parallel pipeline types.
pub struct DocumentPipeline<E, V>
where
    E: EmbeddingProvider,
    V: VectorIndex,
{
    corpus_dir: PathBuf,
    normalizer: Box<dyn TextNormalizer + Send + Sync>,
    index: EmbeddingIndex<E, V>,
    options: PipelineOptions,
}

impl<E, V> DocumentPipeline<E, V>
where
    E: EmbeddingProvider + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(
        corpus_dir: impl Into<PathBuf>,
        normalizer: Box<dyn TextNormalizer + Send + Sync>,
        embedder: E,
        store: V,
        mut options: PipelineOptions,
    ) -> Self {
        options.source_tag = normalizer.source_tag().to_string();

        Self {
            corpus_dir: corpus_dir.into(),
            normalizer,
            index: EmbeddingIndex::new(embedder, store),
            options,
        }
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    /// Indexes the whole corpus folder. File-level and batch-level failures
    /// land in the report instead of aborting.
    pub async fn build(&self) -> Result<CorpusReport, PipelineError> {
        let ingest = process_folder(
            &self.corpus_dir,
            self.normalizer.as_ref(),
            self.options.chunk_size,
        )?;

        let index_report = self
            .index
            .add_documents(&ingest.documents, &self.options)
            .await?;

        let chunk_count = ingest
            .documents
            .iter()
            .map(|document| document.chunks.len())
            .sum();
        let total_raw_chars = ingest.file_stats.iter().map(|stats| stats.raw_chars).sum();
        let total_normalized_chars = ingest
            .file_stats
            .iter()
            .map(|stats| stats.normalized_chars)
            .sum();

        Ok(CorpusReport {
            file_count: ingest.documents.len(),
            chunk_count,
            total_raw_chars,
            total_normalized_chars,
            file_stats: ingest.file_stats,
            skipped_files: ingest.skipped_files,
            index: index_report,
        })
    }

    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        self.index.search(query, n_results).await
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo, RetrievalError> {
        self.index.collection_info().await
    }

    /// Drops the collection and recreates it empty. The drop lands before
    /// the recreate, so callers observe a brief window with no index.
    pub async fn reset_database(&self) -> Result<(), RetrievalError> {
        self.index.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmbeddingRecord, SearchHit};
    use crate::normalize::{MarkdownNormalizer, PlainTextNormalizer};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FixedProvider;

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        records: Mutex<Vec<EmbeddingRecord>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn ensure_ready(&self) -> Result<(), RetrievalError> {
            Ok(())
        }

        async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), RetrievalError> {
            self.records.lock().unwrap().extend_from_slice(records);
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            n_results: usize,
        ) -> Result<Vec<SearchHit>, RetrievalError> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .take(n_results)
                .map(|record| SearchHit {
                    document: record.document.clone(),
                    metadata: record.metadata.clone(),
                    distance: 0.2,
                })
                .collect())
        }

        async fn count(&self) -> Result<usize, RetrievalError> {
            Ok(self.records.lock().unwrap().len())
        }

        async fn drop_collection(&self) -> Result<(), RetrievalError> {
            self.records.lock().unwrap().clear();
            Ok(())
        }

        fn collection_name(&self) -> &str {
            "documents"
        }

        fn persist_location(&self) -> String {
            "http://localhost:8000".to_string()
        }
    }

    #[tokio::test]
    async fn build_indexes_a_folder_and_reports_statistics() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("딥러닝.md"),
            "# 딥러닝\n\n**딥러닝**은 신경망 기반이다[1].\n\n## 같이 보기\n- 머신러닝",
        )
        .unwrap();
        fs::write(dir.path().join("alphago.txt"), "알파고는 바둑 인공지능이다.").unwrap();

        let pipeline = DocumentPipeline::new(
            dir.path(),
            Box::new(PlainTextNormalizer),
            FixedProvider,
            RecordingIndex::default(),
            PipelineOptions::default(),
        );

        let report = pipeline.build().await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.file_count, 2);
        assert_eq!(report.chunk_count, report.index.added_chunks);
        assert!(report.total_raw_chars >= report.total_normalized_chars);
        assert!(report.compression_percent() >= 0.0);
        assert!(report.skipped_files.is_empty());

        let info = pipeline.collection_info().await.unwrap();
        assert_eq!(info.document_count, report.chunk_count);
    }

    #[tokio::test]
    async fn source_tag_follows_the_normalization_strategy() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("doc.md"), "# 제목\n\n본문 내용").unwrap();

        let pipeline = DocumentPipeline::new(
            dir.path(),
            Box::new(MarkdownNormalizer),
            FixedProvider,
            RecordingIndex::default(),
            PipelineOptions::default(),
        );

        pipeline.build().await.unwrap();

        let hits = pipeline.search("본문", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.source, "markdown");
    }

    #[tokio::test]
    async fn search_round_trips_indexed_chunks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("doc.txt"), "트랜스포머 구조 설명").unwrap();

        let pipeline = DocumentPipeline::new(
            dir.path(),
            Box::new(PlainTextNormalizer),
            FixedProvider,
            RecordingIndex::default(),
            PipelineOptions::default(),
        );

        pipeline.build().await.unwrap();
        let hits = pipeline.search("트랜스포머", 3).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert!(hits[0].document.contains("트랜스포머"));
        assert_eq!(hits[0].metadata.file_name, "doc");
    }

    #[tokio::test]
    async fn reset_database_empties_the_collection() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("doc.txt"), "본문").unwrap();

        let pipeline = DocumentPipeline::new(
            dir.path(),
            Box::new(PlainTextNormalizer),
            FixedProvider,
            RecordingIndex::default(),
            PipelineOptions::default(),
        );

        pipeline.build().await.unwrap();
        assert!(pipeline.collection_info().await.unwrap().document_count > 0);

        pipeline.reset_database().await.unwrap();
        assert_eq!(pipeline.collection_info().await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn building_an_empty_folder_is_an_ingest_error() {
        let dir = tempdir().unwrap();

        let pipeline = DocumentPipeline::new(
            dir.path(),
            Box::new(PlainTextNormalizer),
            FixedProvider,
            RecordingIndex::default(),
            PipelineOptions::default(),
        );

        let result = pipeline.build().await;
        assert!(matches!(result, Err(PipelineError::Ingest(_))));
    }
}
