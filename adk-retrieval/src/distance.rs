//! Distance strategies for ranking document vectors against a query vector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The metric used to order stored vectors by nearness to a query vector.
///
/// Fixed per [`SimilaritySearch`](crate::SimilaritySearch) instance. Every
/// strategy yields a *distance* where lower is nearer; only cosine maps that
/// distance onto a `[0, 1]`-style similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistanceStrategy {
    /// L2 distance.
    #[serde(rename = "l2")]
    Euclidean,
    /// One minus cosine similarity.
    #[default]
    #[serde(rename = "cosine")]
    Cosine,
    /// Negated inner product, so larger inner products sort first.
    #[serde(rename = "inner")]
    MaxInnerProduct,
}

impl DistanceStrategy {
    /// The pgvector operator computing this distance.
    pub fn sql_operator(self) -> &'static str {
        match self {
            DistanceStrategy::Euclidean => "<->",
            DistanceStrategy::Cosine => "<=>",
            DistanceStrategy::MaxInnerProduct => "<#>",
        }
    }

    /// Compute the distance between two equal-length vectors.
    ///
    /// Cosine distance against a zero-magnitude vector is `1.0`.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        let dot = || a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum::<f64>();
        match self {
            DistanceStrategy::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = f64::from(*x) - f64::from(*y);
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            DistanceStrategy::Cosine => {
                let norm_a = norm(a);
                let norm_b = norm(b);
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot() / (norm_a * norm_b)
            }
            DistanceStrategy::MaxInnerProduct => -dot(),
        }
    }

    /// Map a distance onto the score reported in
    /// [`DocumentResult::similarity_score`](crate::DocumentResult::similarity_score).
    ///
    /// Cosine reports `1 - distance`; the other strategies pass the raw distance through.
    pub fn similarity(self, distance: f64) -> f64 {
        match self {
            DistanceStrategy::Cosine => 1.0 - distance,
            DistanceStrategy::Euclidean | DistanceStrategy::MaxInnerProduct => distance,
        }
    }
}

impl fmt::Display for DistanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceStrategy::Euclidean => "l2",
            DistanceStrategy::Cosine => "cosine",
            DistanceStrategy::MaxInnerProduct => "inner",
        };
        f.write_str(name)
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn identical_vectors_have_cosine_similarity_one() {
        let v = [0.3, -0.4, 0.5];
        let d = DistanceStrategy::Cosine.distance(&v, &v);
        assert!((DistanceStrategy::Cosine.similarity(d) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_of_orthogonal_vectors_is_one() {
        let d = DistanceStrategy::Cosine.distance(&[1.0, 0.0], &[0.0, 2.0]);
        assert!((d - 1.0).abs() < EPS);
    }

    #[test]
    fn cosine_with_zero_vector_is_maximal_distance() {
        assert_eq!(DistanceStrategy::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn euclidean_distance() {
        let d = DistanceStrategy::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < EPS);
        assert_eq!(DistanceStrategy::Euclidean.similarity(d), d);
    }

    #[test]
    fn inner_product_distance_is_negated() {
        let d = DistanceStrategy::MaxInnerProduct.distance(&[1.0, 2.0], &[3.0, 4.0]);
        assert!((d + 11.0).abs() < EPS);
    }

    #[test]
    fn serde_names_match_display() {
        let strategies = [
            DistanceStrategy::Euclidean,
            DistanceStrategy::Cosine,
            DistanceStrategy::MaxInnerProduct,
        ];
        for strategy in strategies {
            let json = serde_json::to_value(strategy).unwrap();
            assert_eq!(json, serde_json::Value::String(strategy.to_string()));
        }
    }
}
