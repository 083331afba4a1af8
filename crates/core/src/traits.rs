use crate::error::RetrievalError;
use crate::models::{EmbeddingRecord, SearchHit};
use async_trait::async_trait;

/// One logical collection in the external vector store, keyed by a fixed
/// name with get-or-create semantics. Upserting an existing id overwrites
/// the prior record.
#[async_trait]
pub trait VectorIndex {
    async fn ensure_ready(&self) -> Result<(), RetrievalError>;

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), RetrievalError>;

    /// Nearest neighbors in the store's native ascending-distance order.
    async fn query(
        &self,
        vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError>;

    async fn count(&self) -> Result<usize, RetrievalError>;

    async fn drop_collection(&self) -> Result<(), RetrievalError>;

    fn collection_name(&self) -> &str;

    fn persist_location(&self) -> String;
}
