//! Reciprocal rank fusion (RRF) of several ranked result lists.
//!
//! Each list contributes `1 / (rank + k)` to every document it contains,
//! where `rank` is zero-based. Documents are identified by
//! [`DocumentId`](crate::DocumentId), so a document retrieved by several
//! query variants is merged once with its contributions summed.

use std::collections::HashMap;

use crate::document::{DocumentId, DocumentResult};

/// The conventional RRF smoothing constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Merge independently ranked lists into one ranking.
///
/// Every returned document is the most recently seen instance of that id,
/// with `similarity_score` replaced by its accumulated fusion score. Output is
/// ordered by fusion score, descending; equal scores keep the order in which
/// the documents were first seen. Callers truncate to the result count they need.
///
/// `k` must be at least 1.
///
/// # Example
///
/// ```rust,ignore
/// use adk_retrieval::fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};
///
/// let fused = reciprocal_rank_fusion(vec![variant_a, variant_b], DEFAULT_RRF_K);
/// ```
pub fn reciprocal_rank_fusion(
    ranked_lists: Vec<Vec<DocumentResult>>,
    k: usize,
) -> Vec<DocumentResult> {
    let mut slots: HashMap<DocumentId, usize> = HashMap::new();
    let mut fused: Vec<(DocumentResult, f64)> = Vec::new();

    for list in ranked_lists {
        for (rank, doc) in list.into_iter().enumerate() {
            let contribution = 1.0 / (rank as f64 + k as f64);
            match slots.get(&doc.id) {
                Some(&slot) => {
                    let entry = &mut fused[slot];
                    entry.0 = doc;
                    entry.1 += contribution;
                }
                None => {
                    slots.insert(doc.id, fused.len());
                    fused.push((doc, contribution));
                }
            }
        }
    }

    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused
        .into_iter()
        .map(|(mut doc, score)| {
            doc.similarity_score = score;
            doc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn result(id: i64, title: &str) -> DocumentResult {
        DocumentResult {
            id: DocumentId(id),
            text: String::new(),
            title: title.to_string(),
            url: String::new(),
            metadata: Metadata::new(),
            similarity_score: 0.5,
        }
    }

    #[test]
    fn latest_instance_wins_and_scores_sum() {
        let fused = reciprocal_rank_fusion(
            vec![vec![result(1, "first")], vec![result(2, "other"), result(1, "second")]],
            DEFAULT_RRF_K,
        );

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id, DocumentId(1));
        assert_eq!(fused[0].title, "second");
        assert!((fused[0].similarity_score - (1.0 / 60.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((fused[1].similarity_score - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(reciprocal_rank_fusion(Vec::new(), DEFAULT_RRF_K).is_empty());
        assert!(reciprocal_rank_fusion(vec![Vec::new(), Vec::new()], DEFAULT_RRF_K).is_empty());
    }

    #[test]
    fn huge_k_does_not_overflow() {
        let fused = reciprocal_rank_fusion(
            vec![vec![result(1, "a"), result(2, "b")], vec![result(2, "b")]],
            usize::MAX,
        );

        assert_eq!(fused.len(), 2);
        assert!(fused.iter().all(|r| r.similarity_score.is_finite() && r.similarity_score > 0.0));
        assert!(fused[0].similarity_score >= fused[1].similarity_score);
    }

    #[test]
    fn custom_k_changes_contribution() {
        let fused = reciprocal_rank_fusion(vec![vec![result(1, "a"), result(2, "b")]], 1);
        assert!((fused[0].similarity_score - 1.0).abs() < 1e-12);
        assert!((fused[1].similarity_score - 0.5).abs() < 1e-12);
    }
}
