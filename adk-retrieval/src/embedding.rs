//! Embedding provider trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that maps text to fixed-dimension embedding vectors.
///
/// The retrieval engine treats the provider as an opaque text → vector
/// function. Failures are surfaced as
/// [`RetrievalError::Embedding`](crate::RetrievalError::Embedding) and are
/// never retried here; retry policy belongs to the caller.
///
/// The default [`embed_documents`](EmbeddingProvider::embed_documents)
/// calls [`embed_query`](EmbeddingProvider::embed_query) sequentially;
/// backends with native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use adk_retrieval::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed_query("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of document texts, returning one vector per input in order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed_query(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}
