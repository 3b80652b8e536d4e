//! Retriever configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RetrievalError};
use crate::filter::Predicate;
use crate::fusion::DEFAULT_RRF_K;

const DEFAULT_K: usize = 4;

/// How a [`Retriever`](crate::Retriever) turns a query into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Plain top-k nearest neighbours.
    #[default]
    Similarity,
    /// Top-k, then drop results scoring below `score_threshold`.
    SimilarityScoreThreshold,
}

impl SearchType {
    const ALLOWED: [&'static str; 2] = ["similarity", "similarity_score_threshold"];
}

impl FromStr for SearchType {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "similarity" => Ok(SearchType::Similarity),
            "similarity_score_threshold" => Ok(SearchType::SimilarityScoreThreshold),
            other => Err(RetrievalError::validation(format!(
                "search_type of {other} not allowed, valid values are: {}",
                Self::ALLOWED.join(", ")
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Similarity => Self::ALLOWED[0],
            SearchType::SimilarityScoreThreshold => Self::ALLOWED[1],
        })
    }
}

/// Immutable settings bound to one [`Retriever`](crate::Retriever).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub search_type: SearchType,
    /// Number of results to return. Also the truncation length for fused results.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Minimum similarity score, required in threshold mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    /// Metadata filter expression, compiled when the retriever is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Smoothing constant for reciprocal rank fusion.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_rrf_k() -> usize {
    DEFAULT_RRF_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_type: SearchType::Similarity,
            k: DEFAULT_K,
            score_threshold: None,
            filter: None,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl RetrievalConfig {
    /// Start from the defaults; [`build`](RetrievalConfigBuilder::build) validates.
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Parse retriever options in the `{"search_type": .., "search_kwargs": {..}}`
    /// shape and validate them.
    ///
    /// `search_kwargs` may carry `k`, `score_threshold`, `filter` and `rrf_k`.
    ///
    /// ```rust,ignore
    /// let config = RetrievalConfig::from_json(&json!({
    ///     "search_type": "similarity_score_threshold",
    ///     "search_kwargs": {"k": 5, "score_threshold": 0.8, "filter": {"lang": "hi"}}
    /// }))?;
    /// ```
    pub fn from_json(options: &Value) -> Result<Self> {
        let Value::Object(options) = options else {
            return Err(RetrievalError::validation("retriever options must be a mapping"));
        };

        let search_type = match options.get("search_type") {
            None | Some(Value::Null) => SearchType::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(RetrievalError::validation(format!(
                    "search_type must be a string, got {other}"
                )));
            }
        };

        let kwargs = match options.get("search_kwargs") {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(RetrievalError::validation("search_kwargs must be a mapping")),
        };

        let mut builder = Self::builder().search_type(search_type);
        if let Some(k) = kwargs.get("k") {
            builder = builder.k(as_count("k", k)?);
        }
        if let Some(rrf_k) = kwargs.get("rrf_k") {
            builder = builder.rrf_k(as_count("rrf_k", rrf_k)?);
        }
        match kwargs.get("score_threshold") {
            None | Some(Value::Null) => {}
            Some(value) => {
                let threshold = value.as_f64().ok_or_else(|| {
                    RetrievalError::validation(
                        "`score_threshold` must be a number in [0, 1] in `search_kwargs`",
                    )
                })?;
                builder = builder.score_threshold(threshold);
            }
        }
        if let Some(filter) = kwargs.get("filter").filter(|f| !f.is_null()) {
            builder = builder.filter(filter.clone());
        }
        builder.build()
    }

    /// Check the configuration and compile its filter.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] if:
    /// - `k == 0` or `rrf_k == 0`
    /// - threshold mode has no `score_threshold`, or one outside `[0, 1]`
    /// - the filter does not compile
    pub fn validate(&self) -> Result<Option<Predicate>> {
        if self.k == 0 {
            return Err(RetrievalError::validation("k must be greater than zero"));
        }
        if self.rrf_k == 0 {
            return Err(RetrievalError::validation("rrf_k must be greater than zero"));
        }
        if let Some(threshold) = self.score_threshold.filter(|t| !(0.0..=1.0).contains(t)) {
            return Err(RetrievalError::validation(format!(
                "score_threshold must be within [0, 1], got {threshold}"
            )));
        }
        let threshold_mode = self.search_type == SearchType::SimilarityScoreThreshold;
        if threshold_mode && self.score_threshold.is_none() {
            return Err(RetrievalError::validation(
                "`score_threshold` is required for similarity_score_threshold search",
            ));
        }
        self.filter.as_ref().map(Predicate::compile).transpose()
    }
}

fn as_count(name: &str, value: &Value) -> Result<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| RetrievalError::validation(format!("{name} must be a non-negative integer")))
}

/// Builder for a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Select plain similarity or threshold-filtered retrieval.
    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.config.search_type = search_type;
        self
    }

    /// Number of documents to return.
    pub fn k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Minimum relevance score in `[0, 1]` for threshold retrieval.
    pub fn score_threshold(mut self, threshold: f64) -> Self {
        self.config.score_threshold = Some(threshold);
        self
    }

    /// Metadata filter expression, compiled when the config is built.
    pub fn filter(mut self, filter: Value) -> Self {
        self.config.filter = Some(filter);
        self
    }

    /// Rank offset used by reciprocal rank fusion.
    pub fn rrf_k(mut self, rrf_k: usize) -> Self {
        self.config.rrf_k = rrf_k;
        self
    }

    /// Validate and return the configuration. See [`RetrievalConfig::validate`].
    pub fn build(self) -> Result<RetrievalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
