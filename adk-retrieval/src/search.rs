//! Similarity search core.
//!
//! [`SimilaritySearch`] binds an [`EmbeddingProvider`], a [`VectorStore`] and
//! a [`DistanceStrategy`]. It ingests texts (embed → insert) and answers
//! queries (compile filter → embed → nearest-neighbour query → score).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adk_retrieval::{DistanceStrategy, InMemoryVectorStore, SimilaritySearch};
//!
//! let search = Arc::new(
//!     SimilaritySearch::builder()
//!         .embedding_provider(Arc::new(my_embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new(1536)))
//!         .distance_strategy(DistanceStrategy::Cosine)
//!         .build()?,
//! );
//!
//! search.add_texts(&["Raag Yaman is an evening raga"], None).await?;
//! let hits = search.similarity_search("evening ragas", 4, Some(&json!({"lang": "hi"}))).await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::RetrievalConfig;
use crate::distance::DistanceStrategy;
use crate::document::{
    Document, DocumentId, DocumentResult, EmbeddedDocument, Metadata, NewDocument, ScoredDocument,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::filter::Predicate;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// Nearest-neighbour search over one document collection.
///
/// The distance strategy is fixed at construction; use a new instance to
/// search with a different one. Construct via [`SimilaritySearch::builder()`].
pub struct SimilaritySearch {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    distance_strategy: DistanceStrategy,
}

impl SimilaritySearch {
    /// Assemble a search from a provider, a store and a distance strategy.
    pub fn builder() -> SimilaritySearchBuilder {
        SimilaritySearchBuilder::default()
    }

    /// Build a search over `vector_store` and ingest `texts` into it.
    ///
    /// ```rust,ignore
    /// let search = SimilaritySearch::from_texts(
    ///     &["Yaman", "Bhairav"],
    ///     None,
    ///     Arc::new(embedder),
    ///     Arc::new(InMemoryVectorStore::new(1536)),
    ///     DistanceStrategy::Cosine,
    /// )
    /// .await?;
    /// ```
    pub async fn from_texts(
        texts: &[&str],
        metadatas: Option<Vec<Metadata>>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        distance_strategy: DistanceStrategy,
    ) -> Result<Self> {
        let search = Self { embedding_provider, vector_store, distance_strategy };
        search.add_texts(texts, metadatas).await?;
        Ok(search)
    }

    /// Like [`from_texts`](Self::from_texts), for [`Document`]s.
    pub async fn from_documents(
        documents: &[Document],
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        distance_strategy: DistanceStrategy,
    ) -> Result<Self> {
        let search = Self { embedding_provider, vector_store, distance_strategy };
        search.add_documents(documents).await?;
        Ok(search)
    }

    /// The strategy used to rank and score neighbours.
    pub fn distance_strategy(&self) -> DistanceStrategy {
        self.distance_strategy
    }

    /// The provider that embeds queries and documents.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// The backing vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Embed `texts` and store them, returning the new ids in input order.
    ///
    /// See [`add_embeddings`](Self::add_embeddings) for how metadata is handled.
    pub async fn add_texts(
        &self,
        texts: &[&str],
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<Vec<DocumentId>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_metadata_len(texts.len(), metadatas.as_ref())?;

        let embeddings = self.embedding_provider.embed_documents(texts).await.map_err(|e| {
            error!(count = texts.len(), error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != texts.len() {
            return Err(RetrievalError::Embedding {
                provider: "unknown".to_string(),
                message: format!(
                    "provider returned {} embeddings for {} texts",
                    embeddings.len(),
                    texts.len()
                ),
            });
        }

        self.add_embeddings(texts, embeddings, metadatas).await
    }

    /// Embed and store documents.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<Vec<DocumentId>> {
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let metadatas = documents.iter().map(|d| d.metadata.clone()).collect();
        self.add_texts(&texts, Some(metadatas)).await
    }

    /// Store texts with precomputed embeddings in a single bulk insert.
    ///
    /// For each metadata map, `title` and `url` populate the record's fields,
    /// `text_override` is moved out of metadata into the record, and `null`
    /// entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] when `texts`, `embeddings` and
    /// `metadatas` differ in length, and [`RetrievalError::Storage`] when the
    /// insert fails (including embedding dimension mismatches).
    pub async fn add_embeddings(
        &self,
        texts: &[&str],
        embeddings: Vec<Vec<f32>>,
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<Vec<DocumentId>> {
        if embeddings.len() != texts.len() {
            return Err(RetrievalError::validation(format!(
                "got {} texts but {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }
        check_metadata_len(texts.len(), metadatas.as_ref())?;

        let metadatas = metadatas.unwrap_or_else(|| vec![Metadata::new(); texts.len()]);
        let documents: Vec<NewDocument> = texts
            .iter()
            .zip(embeddings)
            .zip(metadatas)
            .map(|((text, embedding), metadata)| {
                NewDocument::from_parts(*text, embedding, metadata)
            })
            .collect();

        let ids = self.vector_store.insert(documents).await.map_err(|e| {
            error!(count = texts.len(), error = %e, "insert failed during ingestion");
            e
        })?;

        info!(count = ids.len(), "ingested documents");
        Ok(ids)
    }

    /// Fetch stored documents by id.
    pub async fn get_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<EmbeddedDocument>> {
        self.vector_store.get_by_ids(ids).await
    }

    /// Return the `k` documents nearest to `query`, optionally restricted by a
    /// filter expression (see [`Predicate::compile`]).
    ///
    /// The filter is validated before the query is embedded.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<DocumentResult>> {
        let predicate = filter.map(Predicate::compile).transpose()?;
        self.search_with_predicate(query, k, predicate.as_ref()).await
    }

    /// Like [`similarity_search`](Self::similarity_search), then drop results
    /// scoring below `score_threshold`.
    ///
    /// An empty outcome is not an error: it is logged as a warning and an
    /// empty list is returned.
    pub async fn similarity_search_with_relevance_scores(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Value>,
        score_threshold: Option<f64>,
    ) -> Result<Vec<DocumentResult>> {
        let predicate = filter.map(Predicate::compile).transpose()?;
        self.relevance_search_with_predicate(query, k, predicate.as_ref(), score_threshold).await
    }

    /// Run one nearest-neighbour query for an already embedded query vector.
    ///
    /// Results are ordered by ascending distance. Exact ties follow the
    /// storage engine's natural row order.
    pub async fn similarity_search_by_vector(
        &self,
        embedding: &[f32],
        k: usize,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<DocumentResult>> {
        check_k(k)?;

        let rows = self
            .vector_store
            .nearest(embedding, k, predicate, self.distance_strategy)
            .await
            .map_err(|e| {
                error!(k, error = %e, "nearest-neighbour query failed");
                e
            })?;

        debug!(k, filtered = predicate.is_some(), returned = rows.len(), "similarity search");
        Ok(rows.into_iter().map(|row| self.to_result(row)).collect())
    }

    pub(crate) async fn search_with_predicate(
        &self,
        query: &str,
        k: usize,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<DocumentResult>> {
        check_k(k)?;
        let embedding = self.embed_query(query).await?;
        self.similarity_search_by_vector(&embedding, k, predicate).await
    }

    pub(crate) async fn relevance_search_with_predicate(
        &self,
        query: &str,
        k: usize,
        predicate: Option<&Predicate>,
        score_threshold: Option<f64>,
    ) -> Result<Vec<DocumentResult>> {
        let results = self.search_with_predicate(query, k, predicate).await?;

        if results.iter().any(|r| !(0.0..=1.0).contains(&r.similarity_score)) {
            warn!(
                strategy = %self.distance_strategy,
                "relevance scores must be between 0 and 1; only cosine guarantees this"
            );
        }

        let Some(threshold) = score_threshold else {
            return Ok(results);
        };

        let filtered: Vec<DocumentResult> =
            results.into_iter().filter(|r| r.similarity_score >= threshold).collect();
        if filtered.is_empty() {
            warn!(
                score_threshold = threshold,
                "no relevant docs were retrieved using the relevance score threshold"
            );
        }
        Ok(filtered)
    }

    /// Bind this search to a validated [`RetrievalConfig`].
    pub fn as_retriever(self: &Arc<Self>, config: RetrievalConfig) -> Result<Retriever> {
        Retriever::new(Arc::clone(self), config)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embedding_provider
            .embed_query(query)
            .await
            .map_err(|e| {
                error!(error = %e, "query embedding failed");
                e
            })
    }

    fn to_result(&self, row: ScoredDocument) -> DocumentResult {
        let ScoredDocument { document, distance } = row;
        DocumentResult {
            id: document.id,
            text: document.text_override.unwrap_or(document.text),
            title: document.title,
            url: document.url,
            metadata: document.metadata,
            similarity_score: self.distance_strategy.similarity(distance),
        }
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RetrievalError::validation("k must be greater than zero"));
    }
    Ok(())
}

fn check_metadata_len(expected: usize, metadatas: Option<&Vec<Metadata>>) -> Result<()> {
    match metadatas {
        Some(m) if m.len() != expected => Err(RetrievalError::validation(format!(
            "got {expected} texts but {} metadata entries",
            m.len()
        ))),
        _ => Ok(()),
    }
}

/// Builder for a [`SimilaritySearch`].
///
/// `embedding_provider` and `vector_store` are required; the distance
/// strategy defaults to cosine.
#[derive(Default)]
pub struct SimilaritySearchBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    distance_strategy: DistanceStrategy,
}

impl SimilaritySearchBuilder {
    /// Required.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Required.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Defaults to [`DistanceStrategy::Cosine`].
    pub fn distance_strategy(mut self, strategy: DistanceStrategy) -> Self {
        self.distance_strategy = strategy;
        self
    }

    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] if a required part is missing.
    pub fn build(self) -> Result<SimilaritySearch> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RetrievalError::validation("embedding_provider is required"))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RetrievalError::validation("vector_store is required"))?;

        Ok(SimilaritySearch {
            embedding_provider,
            vector_store,
            distance_strategy: self.distance_strategy,
        })
    }
}
