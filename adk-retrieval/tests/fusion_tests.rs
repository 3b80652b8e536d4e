//! Reciprocal rank fusion properties.

use adk_retrieval::{DEFAULT_RRF_K, DocumentId, DocumentResult, Metadata, reciprocal_rank_fusion};
use proptest::prelude::*;

fn doc(id: i64) -> DocumentResult {
    DocumentResult {
        id: DocumentId(id),
        text: format!("doc {id}"),
        title: String::new(),
        url: String::new(),
        metadata: Metadata::new(),
        similarity_score: 0.0,
    }
}

fn ids(results: &[DocumentResult]) -> Vec<i64> {
    results.iter().map(|r| r.id.0).collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-12, "expected {expected}, got {actual}");
}

#[test]
fn repeated_identical_rankings_scale_scores() {
    for copies in 1..=4 {
        let lists = vec![vec![doc(1), doc(2), doc(3)]; copies];
        let fused = reciprocal_rank_fusion(lists, DEFAULT_RRF_K);

        assert_eq!(ids(&fused), vec![1, 2, 3]);
        let n = copies as f64;
        assert_close(fused[0].similarity_score, n / 60.0);
        assert_close(fused[1].similarity_score, n / 61.0);
        assert_close(fused[2].similarity_score, n / 62.0);
    }
}

#[test]
fn overlapping_rankings_sum_contributions() {
    // A=1, B=2, C=3, D=4
    let fused = reciprocal_rank_fusion(
        vec![vec![doc(1), doc(2), doc(3)], vec![doc(2), doc(1), doc(4)]],
        DEFAULT_RRF_K,
    );

    assert_eq!(fused.len(), 4);
    let both = 1.0 / 60.0 + 1.0 / 61.0;
    assert_close(fused[0].similarity_score, both);
    assert_close(fused[1].similarity_score, both);
    assert_close(fused[2].similarity_score, 1.0 / 62.0);
    assert_close(fused[3].similarity_score, 1.0 / 62.0);
    // Ties keep first-seen order.
    assert_eq!(ids(&fused), vec![1, 2, 3, 4]);
}

#[test]
fn fused_score_replaces_similarity() {
    let mut first = doc(7);
    first.similarity_score = 0.93;
    let fused = reciprocal_rank_fusion(vec![vec![first]], DEFAULT_RRF_K);
    assert_close(fused[0].similarity_score, 1.0 / 60.0);
}

fn arb_ranking() -> impl Strategy<Value = Vec<i64>> {
    prop::sample::subsequence((0i64..12).collect::<Vec<_>>(), 0..=12).prop_shuffle()
}

mod prop_fusion {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn single_ranking_is_preserved(ranking in arb_ranking(), k in 1usize..100) {
            let list = ranking.iter().map(|&id| doc(id)).collect();
            let fused = reciprocal_rank_fusion(vec![list], k);
            prop_assert_eq!(ids(&fused), ranking);
        }

        #[test]
        fn scores_do_not_depend_on_list_order(
            rankings in prop::collection::vec(arb_ranking(), 1..5),
        ) {
            let lists: Vec<Vec<DocumentResult>> =
                rankings.iter().map(|r| r.iter().map(|&id| doc(id)).collect()).collect();
            let mut reversed = lists.clone();
            reversed.reverse();

            let score_of = |fused: Vec<DocumentResult>| {
                let mut scores: Vec<(i64, f64)> =
                    fused.into_iter().map(|r| (r.id.0, r.similarity_score)).collect();
                scores.sort_by_key(|(id, _)| *id);
                scores
            };
            let forward = score_of(reciprocal_rank_fusion(lists, DEFAULT_RRF_K));
            let backward = score_of(reciprocal_rank_fusion(reversed, DEFAULT_RRF_K));

            prop_assert_eq!(forward.len(), backward.len());
            for ((a, x), (b, y)) in forward.iter().zip(&backward) {
                prop_assert_eq!(a, b);
                prop_assert!((x - y).abs() < 1e-12);
            }
        }

        #[test]
        fn output_is_deduplicated_and_descending(
            rankings in prop::collection::vec(arb_ranking(), 0..5),
        ) {
            let lists = rankings.iter().map(|r| r.iter().map(|&id| doc(id)).collect()).collect();
            let fused = reciprocal_rank_fusion(lists, DEFAULT_RRF_K);

            let mut seen = ids(&fused);
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), fused.len());
            prop_assert!(fused.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
        }
    }
}
