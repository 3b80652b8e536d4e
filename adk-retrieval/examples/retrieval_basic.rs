//! # Retrieval Basic Example
//!
//! Ingests a handful of raga descriptions, then queries them with a metadata
//! filter, a score threshold and multi-query rank fusion.
//!
//! Uses `InMemoryVectorStore` and a deterministic `BagOfWordsEmbedder` so it
//! runs with **zero API keys**.
//!
//! Run: `RUST_LOG=adk_retrieval=debug cargo run --example retrieval_basic`

use std::sync::Arc;

use adk_retrieval::{
    Document, EmbeddingProvider, InMemoryVectorStore, RetrievalConfig, SearchType,
    SimilaritySearch,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// BagOfWordsEmbedder: hashes each word into a bucket, then L2-normalises
// ---------------------------------------------------------------------------

struct BagOfWordsEmbedder {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed_query(&self, text: &str) -> adk_retrieval::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn print_results(label: &str, results: &[adk_retrieval::DocumentResult]) {
    println!("\n{label}");
    if results.is_empty() {
        println!("  (no results)");
    }
    for (i, r) in results.iter().enumerate() {
        println!("  {}. [{:.4}] {} ({})", i + 1, r.similarity_score, r.title, r.text);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // -- 1. Build the search ----------------------------------------------
    let search = Arc::new(
        SimilaritySearch::builder()
            .embedding_provider(Arc::new(BagOfWordsEmbedder { dimensions: 128 }))
            .vector_store(Arc::new(InMemoryVectorStore::new(128)))
            .build()?,
    );

    // -- 2. Ingest ----------------------------------------------------------
    let documents = vec![
        Document::new("Yaman is an evening raga of the Kalyan thaat")
            .with_metadata("title", "Yaman")
            .with_metadata("lang", "hi")
            .with_metadata("year", 1965),
        Document::new("Bhairav is a morning raga sung at dawn")
            .with_metadata("title", "Bhairav")
            .with_metadata("lang", "hi")
            .with_metadata("year", 1972),
        Document::new("Marwa is sung at dusk, the evening twilight")
            .with_metadata("title", "Marwa")
            .with_metadata("lang", "hi")
            .with_metadata("year", 1981),
        Document::new("Evensong is an evening service of the Anglican church")
            .with_metadata("title", "Evensong")
            .with_metadata("lang", "en")
            .with_metadata("year", 1990),
    ];
    let ids = search.add_documents(&documents).await?;
    println!("Ingested {} documents with ids {:?}", ids.len(), ids);

    // -- 3. Filtered similarity search ----------------------------------------
    let filter = json!({"$and": [{"lang": "hi"}, {"year": {"$gte": 1970}}]});
    let results = search.similarity_search("evening raga", 3, Some(&filter)).await?;
    print_results("Hindi ragas from 1970 on, for 'evening raga':", &results);

    // -- 4. Thresholded retriever -----------------------------------------
    let retriever = search.as_retriever(
        RetrievalConfig::builder()
            .search_type(SearchType::SimilarityScoreThreshold)
            .score_threshold(0.3)
            .k(3)
            .build()?,
    )?;
    print_results("Score >= 0.3 for 'evening raga':", &retriever.ainvoke("evening raga").await?);

    // -- 5. Multi-query fusion --------------------------------------------
    let retriever = search.as_retriever(RetrievalConfig::builder().k(3).build()?)?;
    let fused = retriever
        .arrf_invoke(&["evening raga", "raga sung at dusk", "twilight music"], None)
        .await?;
    print_results("Fused over three paraphrases:", &fused);

    Ok(())
}
