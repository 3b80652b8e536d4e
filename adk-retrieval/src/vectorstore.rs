//! Storage engine boundary for embedded documents.

use async_trait::async_trait;

use crate::distance::DistanceStrategy;
use crate::document::{DocumentId, EmbeddedDocument, NewDocument, ScoredDocument};
use crate::error::Result;
use crate::filter::Predicate;

/// A storage backend holding one collection of embedded documents.
///
/// The retrieval engine only reads and appends through this trait; stored
/// documents are never mutated in place. Every document in a store has the
/// same embedding dimension, and inserting a mismatched vector fails with
/// [`RetrievalError::Storage`](crate::RetrievalError::Storage).
///
/// # Example
///
/// ```rust,ignore
/// use adk_retrieval::{DistanceStrategy, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// let ids = store.insert(documents).await?;
/// let nearest = store.nearest(&query, 5, None, DistanceStrategy::Cosine).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk-insert documents, returning the storage-assigned ids in input order.
    async fn insert(&self, documents: Vec<NewDocument>) -> Result<Vec<DocumentId>>;

    /// Fetch documents by id. Unknown ids are skipped.
    async fn get_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<EmbeddedDocument>>;

    /// Return at most `k` documents matching `predicate`, ordered by ascending
    /// `strategy` distance to `embedding`.
    ///
    /// Exact distance ties keep the engine's natural row order.
    async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        predicate: Option<&Predicate>,
        strategy: DistanceStrategy,
    ) -> Result<Vec<ScoredDocument>>;
}
