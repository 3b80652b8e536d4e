//! Configured retrieval façade.
//!
//! A [`Retriever`] binds a [`RetrievalConfig`] to a [`SimilaritySearch`] and
//! exposes single-query and multi-query (fused) retrieval, each in an async
//! form and a blocking form.
//!
//! # Example
//!
//! ```rust,ignore
//! let retriever = search.as_retriever(
//!     RetrievalConfig::builder().k(5).filter(json!({"lang": "hi"})).build()?,
//! )?;
//!
//! let docs = retriever.ainvoke("evening ragas").await?;
//! let fused = retriever
//!     .arrf_invoke(&["evening ragas", "ragas sung at dusk", "sandhya raag"], None)
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use crate::config::{RetrievalConfig, SearchType};
use crate::document::DocumentResult;
use crate::error::{Result, RetrievalError};
use crate::filter::Predicate;
use crate::fusion::reciprocal_rank_fusion;
use crate::search::SimilaritySearch;

/// Repeatable retrieval with a fixed search mode, filter and result count.
///
/// Validation happens in [`Retriever::new`]: an invalid configuration never
/// reaches the embedding provider or the storage engine.
pub struct Retriever {
    search: Arc<SimilaritySearch>,
    config: RetrievalConfig,
    predicate: Option<Predicate>,
    runtime: Option<Handle>,
}

impl Retriever {
    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] if the configuration is invalid
    /// (see [`RetrievalConfig::validate`]).
    pub fn new(search: Arc<SimilaritySearch>, config: RetrievalConfig) -> Result<Self> {
        let predicate = config.validate()?;
        Ok(Self { search, config, predicate, runtime: None })
    }

    /// Runtime used by the blocking methods when called outside a
    /// multi-threaded runtime.
    ///
    /// Storage clients bound to a runtime (such as a pgvector pool) need this
    /// to be a handle to the multi-threaded runtime that created them. Without
    /// it, blocking calls from outside a runtime build a fresh single-threaded one.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// The validated configuration this retriever was built with.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The compiled form of the configured filter.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Retrieve documents for one query according to the configured search type.
    ///
    /// Suspends only on the embedding call and the storage query.
    pub async fn ainvoke(&self, query: &str) -> Result<Vec<DocumentResult>> {
        let k = self.config.k;
        let predicate = self.predicate.as_ref();
        match self.config.search_type {
            SearchType::Similarity => self.search.search_with_predicate(query, k, predicate).await,
            SearchType::SimilarityScoreThreshold => {
                let threshold = self.config.score_threshold;
                self.search.relevance_search_with_predicate(query, k, predicate, threshold).await
            }
        }
    }

    /// Blocking form of [`ainvoke`](Self::ainvoke).
    ///
    /// Inside a multi-threaded Tokio runtime the worker is handed off with
    /// `block_in_place`. Inside a current-thread runtime, including its
    /// `spawn_blocking` threads, the retrieval runs to completion on a scoped
    /// helper thread while the caller waits.
    pub fn invoke(&self, query: &str) -> Result<Vec<DocumentResult>> {
        self.block_on(self.ainvoke(query))
    }

    /// Retrieve each query variant concurrently and fuse the rankings.
    ///
    /// One retrieval runs per variant with no ordering between them. The first
    /// failing variant fails the whole call and the remaining variants are
    /// dropped, as they are when the returned future is dropped. The fused list
    /// is truncated to the configured `k`. `rrf_k` overrides the configured
    /// fusion constant.
    pub async fn arrf_invoke(
        &self,
        queries: &[&str],
        rrf_k: Option<usize>,
    ) -> Result<Vec<DocumentResult>> {
        let rrf_k = self.fusion_constant(rrf_k)?;
        debug!(variants = queries.len(), rrf_k, "multi-query retrieval");

        let ranked = try_join_all(queries.iter().map(|query| self.ainvoke(query))).await?;
        Ok(self.fuse(ranked, rrf_k))
    }

    /// Blocking form of [`arrf_invoke`](Self::arrf_invoke).
    pub fn rrf_invoke(
        &self,
        queries: &[&str],
        rrf_k: Option<usize>,
    ) -> Result<Vec<DocumentResult>> {
        self.block_on(self.arrf_invoke(queries, rrf_k))
    }

    fn fusion_constant(&self, rrf_k: Option<usize>) -> Result<usize> {
        match rrf_k.unwrap_or(self.config.rrf_k) {
            0 => Err(RetrievalError::validation("rrf_k must be greater than zero")),
            k => Ok(k),
        }
    }

    fn fuse(&self, ranked: Vec<Vec<DocumentResult>>, rrf_k: usize) -> Vec<DocumentResult> {
        let variants = ranked.len();
        let mut fused = reciprocal_rank_fusion(ranked, rrf_k);
        fused.truncate(self.config.k);
        info!(variants, result_count = fused.len(), "rank fusion completed");
        fused
    }

    fn block_on<T: Send>(&self, future: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            // The caller owns the only worker of a current-thread runtime (or
            // sits on one of its blocking threads); drive the future elsewhere.
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(move || self.block_on_detached(future, false))
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            }),
            Err(_) => self.block_on_detached(future, true),
        }
    }

    /// Drive `future` from a thread outside any runtime context.
    ///
    /// A configured current-thread handle is only used when the caller is not
    /// already inside some runtime, since that runtime may be the one blocked.
    fn block_on_detached<T>(
        &self,
        future: impl Future<Output = Result<T>>,
        any_flavor: bool,
    ) -> Result<T> {
        if let Some(handle) = self
            .runtime
            .as_ref()
            .filter(|h| any_flavor || h.runtime_flavor() == RuntimeFlavor::MultiThread)
        {
            return handle.block_on(future);
        }

        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RetrievalError::Runtime(format!("failed to build runtime: {e}")))?
            .block_on(future)
    }
}
