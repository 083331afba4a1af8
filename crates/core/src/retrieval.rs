use crate::chunking::build_chunks;
use crate::embeddings::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::models::{
    ChunkMetadata, CollectionInfo, DocumentChunk, EmbeddingRecord, IndexReport, PipelineOptions,
    ProcessedDocument, SearchHit, SkippedBatch,
};
use crate::traits::VectorIndex;

/// Best-effort retrieval layer over an embedding provider and a vector
/// index. A failed batch is skipped, not fatal; its chunks are simply
/// absent from the index, never half-written.
pub struct EmbeddingIndex<E, V> {
    embedder: E,
    index: V,
}

impl<E, V> EmbeddingIndex<E, V>
where
    E: EmbeddingProvider + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(embedder: E, index: V) -> Self {
        Self { embedder, index }
    }

    /// Embeds and upserts every chunk of the given documents. Re-adding a
    /// document overwrites its previous records. Success means at least one
    /// chunk got through.
    pub async fn add_documents(
        &self,
        documents: &[ProcessedDocument],
        options: &PipelineOptions,
    ) -> Result<IndexReport, RetrievalError> {
        let mut pending: Vec<(DocumentChunk, ChunkMetadata)> = Vec::new();

        for document in documents {
            let chunks = build_chunks(
                &document.file_name,
                &document.file_path,
                document.chunks.clone(),
            );

            for chunk in chunks {
                let metadata = ChunkMetadata {
                    file_name: chunk.document_name.clone(),
                    file_path: chunk.source_path.clone(),
                    chunk_index: chunk.chunk_index,
                    total_chunks: chunk.total_chunks,
                    source: options.source_tag.clone(),
                    extra: document.metadata.clone(),
                };
                pending.push((chunk, metadata));
            }
        }

        let mut report = IndexReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let batch_size = options.embed_batch_size.max(1);

        for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|(chunk, _)| chunk.text.clone()).collect();

            let vectors = match self.embedder.embed(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => vectors,
                Ok(vectors) => {
                    report.skipped_batches.push(SkippedBatch {
                        batch_index,
                        chunk_count: batch.len(),
                        reason: format!(
                            "provider returned {} vectors for {} chunks",
                            vectors.len(),
                            batch.len()
                        ),
                    });
                    continue;
                }
                Err(error) => {
                    report.skipped_batches.push(SkippedBatch {
                        batch_index,
                        chunk_count: batch.len(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            let records: Vec<EmbeddingRecord> = batch
                .iter()
                .zip(vectors)
                .map(|((chunk, metadata), vector)| EmbeddingRecord {
                    id: chunk.chunk_id.clone(),
                    vector,
                    document: chunk.text.clone(),
                    metadata: metadata.clone(),
                })
                .collect();

            if let Err(error) = self.index.upsert(&records).await {
                report.skipped_batches.push(SkippedBatch {
                    batch_index,
                    chunk_count: batch.len(),
                    reason: error.to_string(),
                });
                continue;
            }

            report.added_chunks += batch.len();
        }

        Ok(report)
    }

    /// Nearest neighbors in ascending distance order. A blank query or an
    /// empty index yields an empty list, not an error.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable("no vector returned for query".to_string())
        })?;

        self.index.query(&vector, n_results).await
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo, RetrievalError> {
        let document_count = self.index.count().await?;

        Ok(CollectionInfo {
            name: self.index.collection_name().to_string(),
            document_count,
            persist_location: self.index.persist_location(),
        })
    }

    /// Drops and recreates the collection. There is a brief window with no
    /// index between the two steps.
    pub async fn reset(&self) -> Result<(), RetrievalError> {
        self.index.drop_collection().await?;
        self.index.ensure_ready().await
    }
}
