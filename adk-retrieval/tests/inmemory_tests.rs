//! Property tests for in-memory nearest-neighbour ordering.

use std::collections::HashMap;

use adk_retrieval::{DistanceStrategy, InMemoryVectorStore, NewDocument, Predicate, VectorStore};
use proptest::prelude::*;
use serde_json::json;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

fn arb_document(dim: usize) -> impl Strategy<Value = NewDocument> {
    ("[a-z ]{5,30}", 0i64..4, arb_normalized_embedding(dim)).prop_map(|(text, group, embedding)| {
        let metadata = HashMap::from([("group".to_string(), json!(group))]);
        NewDocument::from_parts(text, embedding, metadata)
    })
}

fn arb_strategy() -> impl Strategy<Value = DistanceStrategy> {
    prop_oneof![
        Just(DistanceStrategy::Cosine),
        Just(DistanceStrategy::Euclidean),
        Just(DistanceStrategy::MaxInnerProduct),
    ]
}

/// Results come back nearest first, never exceed `k`, and only contain
/// documents the predicate accepts.
mod prop_inmemory_nearest {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_k(
            documents in proptest::collection::vec(arb_document(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
            strategy in arb_strategy(),
            group in 0i64..4,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (all, filtered, stored) = rt.block_on(async {
                let store = InMemoryVectorStore::new(DIM);
                let stored = documents.len();
                store.insert(documents).await.unwrap();

                let predicate = Predicate::compile(&json!({"group": group})).unwrap();
                let all = store.nearest(&query, k, None, strategy).await.unwrap();
                let filtered = store.nearest(&query, k, Some(&predicate), strategy).await.unwrap();
                (all, filtered, stored)
            });

            prop_assert!(all.len() <= k);
            prop_assert_eq!(all.len(), k.min(stored));
            prop_assert!(filtered.len() <= k);

            for results in [&all, &filtered] {
                for pair in results.windows(2) {
                    prop_assert!(
                        pair[0].distance <= pair[1].distance,
                        "not ascending: {} > {}",
                        pair[0].distance,
                        pair[1].distance
                    );
                }
            }
            for hit in &filtered {
                prop_assert_eq!(hit.document.metadata.get("group"), Some(&json!(group)));
            }
        }
    }
}
