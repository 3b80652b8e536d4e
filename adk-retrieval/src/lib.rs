//! # adk-retrieval
//!
//! Metadata-filtered vector similarity retrieval for ADK-Rust agents.
//!
//! A query string is embedded, matched against stored document vectors under
//! a configurable [`DistanceStrategy`], optionally restricted by a JSON filter
//! expression over document metadata, and returned as ranked
//! [`DocumentResult`]s. Several paraphrased query variants can be retrieved
//! concurrently and merged with reciprocal rank fusion.
//!
//! ## Building blocks
//!
//! - [`EmbeddingProvider`]: text → vector (OpenAI behind the `openai` feature)
//! - [`VectorStore`]: storage engine ([`InMemoryVectorStore`], or pgvector
//!   behind the `pgvector` feature)
//! - [`Predicate`]: compiled metadata filter
//! - [`SimilaritySearch`]: ingestion and nearest-neighbour search
//! - [`Retriever`]: configured facade with `invoke`/`ainvoke` and
//!   `rrf_invoke`/`arrf_invoke`
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adk_retrieval::{InMemoryVectorStore, RetrievalConfig, SimilaritySearch};
//! use serde_json::json;
//!
//! let search = Arc::new(
//!     SimilaritySearch::builder()
//!         .embedding_provider(Arc::new(embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new(1536)))
//!         .build()?,
//! );
//! search.add_texts(&["Raag Yaman is sung in the evening"], None).await?;
//!
//! let retriever = search.as_retriever(
//!     RetrievalConfig::builder()
//!         .k(3)
//!         .filter(json!({"$and": [{"lang": "hi"}, {"year": {"$gte": 1970}}]}))
//!         .build()?,
//! )?;
//! let docs = retriever.arrf_invoke(&["evening raga", "raga for dusk"], None).await?;
//! ```

pub mod config;
pub mod distance;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod inmemory;
pub mod retriever;
pub mod search;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use config::{RetrievalConfig, RetrievalConfigBuilder, SearchType};
pub use distance::DistanceStrategy;
pub use document::{
    Document, DocumentId, DocumentResult, EmbeddedDocument, Metadata, NewDocument, ScoredDocument,
};
pub use embedding::EmbeddingProvider;
pub use error::{Result, RetrievalError};
pub use filter::{LikePattern, Predicate};
pub use fusion::{DEFAULT_RRF_K, reciprocal_rank_fusion};
pub use inmemory::InMemoryVectorStore;
pub use retriever::Retriever;
pub use search::{SimilaritySearch, SimilaritySearchBuilder};
pub use vectorstore::VectorStore;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;

#[cfg(feature = "pgvector")]
pub use pgvector::PgVectorStore;
