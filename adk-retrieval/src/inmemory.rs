//! In-memory storage engine.
//!
//! [`InMemoryVectorStore`] keeps documents in insertion order behind a
//! `tokio::sync::RwLock` and scans them linearly on every query. It is meant
//! for development, tests and small corpora.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::distance::DistanceStrategy;
use crate::document::{DocumentId, EmbeddedDocument, NewDocument, ScoredDocument};
use crate::error::{Result, RetrievalError};
use crate::filter::Predicate;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// A [`VectorStore`] held entirely in process memory.
///
/// Ids are assigned from a counter starting at 1. The natural row order used
/// for distance ties is insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use adk_retrieval::InMemoryVectorStore;
///
/// let store = InMemoryVectorStore::new(1536);
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    rows: RwLock<Rows>,
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    documents: Vec<EmbeddedDocument>,
}

impl InMemoryVectorStore {
    /// Create an empty store accepting embeddings of exactly `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, rows: RwLock::new(Rows { next_id: 1, documents: Vec::new() }) }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.rows.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_dimensions(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimensions {
            return Err(RetrievalError::Storage {
                backend: BACKEND.to_string(),
                message: format!(
                    "{what} has dimension {len}, collection expects {}",
                    self.dimensions
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, documents: Vec<NewDocument>) -> Result<Vec<DocumentId>> {
        // Validate the whole batch first so a bad row inserts nothing.
        for doc in &documents {
            self.check_dimensions(doc.embedding.len(), "embedding")?;
        }

        let mut rows = self.rows.write().await;
        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = DocumentId(rows.next_id);
            rows.next_id += 1;
            rows.documents.push(EmbeddedDocument {
                id,
                title: doc.title,
                url: doc.url,
                text: doc.text,
                text_override: doc.text_override,
                metadata: doc.metadata,
                embedding: doc.embedding,
            });
            ids.push(id);
        }

        debug!(backend = BACKEND, count = ids.len(), "inserted documents");
        Ok(ids)
    }

    async fn get_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<EmbeddedDocument>> {
        let rows = self.rows.read().await;
        Ok(rows.documents.iter().filter(|doc| ids.contains(&doc.id)).cloned().collect())
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        predicate: Option<&Predicate>,
        strategy: DistanceStrategy,
    ) -> Result<Vec<ScoredDocument>> {
        self.check_dimensions(embedding.len(), "query vector")?;

        let rows = self.rows.read().await;
        let mut ranked: Vec<_> = rows
            .documents
            .iter()
            .filter(|doc| predicate.is_none_or(|p| p.matches(&doc.metadata)))
            .map(|doc| (strategy.distance(&doc.embedding, embedding), doc))
            .collect();

        // Stable sort keeps insertion order for exact ties.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked.truncate(k);

        let scored: Vec<ScoredDocument> = ranked
            .into_iter()
            .map(|(distance, doc)| ScoredDocument { distance, document: doc.clone() })
            .collect();

        debug!(backend = BACKEND, %strategy, k, matched = scored.len(), "nearest-neighbour scan");
        Ok(scored)
    }
}
