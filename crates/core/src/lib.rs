pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod relevance;
pub mod retrieval;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, split_into_chunks};
pub use embeddings::{
    EmbeddingProvider, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{IngestError, PipelineError, RetrievalError};
pub use ingest::{discover_document_files, process_folder, read_source_document, CorpusIngest};
pub use models::{
    chunk_id, ChunkMetadata, CollectionInfo, CorpusReport, DocumentChunk, EmbeddingRecord,
    FileStats, IndexReport, PipelineOptions, ProcessedDocument, SearchHit, SkippedBatch,
    SkippedFile, SourceDocument,
};
pub use normalize::{
    normalize_markdown, normalize_plain_text, MarkdownNormalizer, PlainTextNormalizer,
    TextNormalizer,
};
pub use orchestrator::DocumentPipeline;
pub use relevance::{
    calculate_relevance_score, extract_relevant_lines, rank_titles, ScoredTitle,
    DEFAULT_SNIPPET_LINES, MIN_RELEVANCE,
};
pub use retrieval::EmbeddingIndex;
pub use stores::ChromaStore;
pub use traits::VectorIndex;
