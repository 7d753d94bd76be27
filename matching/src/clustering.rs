//! K-Means++ sub-clustering of reference utterance embeddings.
//!
//! Each route's reference utterances are clustered into a handful of
//! centroids so the route can be matched by "closest to any prototype"
//! instead of forcing distinct sub-intents toward a single mean.
//!
//! Assignment uses cosine similarity, matching the metric used by the
//! downstream matchers; initialization spread and convergence testing use
//! Euclidean distance. Both metrics are intentional and must not be
//! unified.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use semgate_embeddings::Embedding;
use semgate_embeddings::vector::{cosine_similarity, euclidean_distance};

/// Iteration cap guaranteeing termination even without convergence.
const MAX_ITERATIONS: usize = 100;

/// Maximum per-centroid Euclidean shift still counted as converged.
const CONVERGENCE_EPSILON: f32 = 1e-4;

/// Pick a cluster count for `n` reference vectors.
///
/// A fixed heuristic, not an elbow-method computation: few utterances get
/// one or two prototypes, larger sets grow as `ceil(sqrt(n/2))` capped at 5.
pub fn optimal_k(n: usize) -> usize {
    if n <= 2 {
        1
    } else if n <= 4 {
        2
    } else {
        (((n as f64 / 2.0).sqrt()).ceil() as usize).clamp(2, 5)
    }
}

/// Cluster `vectors` into `k` centroids.
///
/// Runs K-Means++ initialization followed by Lloyd's algorithm. Empty input
/// yields no centroids; `k <= 1` or a single input vector yields one
/// centroid equal to the arithmetic mean. Given identical inputs and the
/// same `seed` the result is bit-for-bit reproducible.
pub fn cluster(vectors: &[Embedding], k: usize, seed: u64) -> Vec<Embedding> {
    if vectors.is_empty() {
        return Vec::new();
    }
    if k <= 1 || vectors.len() == 1 {
        return vec![mean(vectors)];
    }

    let k = k.min(vectors.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_plus_plus(vectors, k, &mut rng);
    let mut assignments = vec![usize::MAX; vectors.len()];

    for iteration in 0..MAX_ITERATIONS {
        // Assignment step: highest cosine similarity wins.
        let mut changed = false;
        for (i, vector) in vectors.iter().enumerate() {
            let best = nearest_centroid(vector, &centroids);
            if assignments[i] != best {
                assignments[i] = best;
                changed = true;
            }
        }

        // Update step: recompute each centroid as the mean of its members;
        // reseed empty clusters to a random input vector.
        let mut max_shift = 0.0f32;
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Embedding> = vectors
                .iter()
                .zip(assignments.iter())
                .filter(|(_, assigned)| **assigned == c)
                .map(|(v, _)| v)
                .collect();

            let updated = if members.is_empty() {
                vectors[rng.random_range(0..vectors.len())].clone()
            } else {
                mean_of(&members)
            };

            max_shift = max_shift.max(euclidean_distance(centroid, &updated));
            *centroid = updated;
        }

        if !changed || max_shift < CONVERGENCE_EPSILON {
            debug!(iteration, k, "clustering converged");
            break;
        }
    }

    centroids
}

/// K-Means++ initialization: first centroid uniform-random, each subsequent
/// centroid drawn with probability proportional to its squared Euclidean
/// distance from the nearest already-chosen centroid.
fn init_plus_plus(vectors: &[Embedding], k: usize, rng: &mut StdRng) -> Vec<Embedding> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.random_range(0..vectors.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f32> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| {
                        let d = euclidean_distance(v, c);
                        d * d
                    })
                    .fold(f32::INFINITY, f32::min)
            })
            .collect();

        let total: f32 = weights.iter().sum();
        let index = if total <= 0.0 {
            // All points coincide with chosen centroids.
            rng.random_range(0..vectors.len())
        } else {
            let mut target = rng.random::<f32>() * total;
            let mut chosen = vectors.len() - 1;
            for (i, weight) in weights.iter().enumerate() {
                target -= weight;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centroids.push(vectors[index].clone());
    }

    centroids
}

fn nearest_centroid(vector: &Embedding, centroids: &[Embedding]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let score = cosine_similarity(vector, centroid);
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

fn mean(vectors: &[Embedding]) -> Embedding {
    let refs: Vec<&Embedding> = vectors.iter().collect();
    mean_of(&refs)
}

fn mean_of(vectors: &[&Embedding]) -> Embedding {
    let dim = vectors.first().map_or(0, |v| v.len());
    let mut out = vec![0.0f32; dim];
    let n = vectors.len() as f32;
    for vector in vectors {
        for (slot, value) in out.iter_mut().zip(vector.iter()) {
            *slot += value / n;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_optimal_k_heuristic() {
        assert_eq!(optimal_k(1), 1);
        assert_eq!(optimal_k(2), 1);
        assert_eq!(optimal_k(3), 2);
        assert_eq!(optimal_k(4), 2);
        assert_eq!(optimal_k(5), 2);
        assert_eq!(optimal_k(8), 2);
        assert_eq!(optimal_k(18), 3);
        assert_eq!(optimal_k(32), 4);
        assert_eq!(optimal_k(50), 5);
        assert_eq!(optimal_k(1000), 5);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster(&[], 3, 42).is_empty());
    }

    #[test]
    fn test_k_one_returns_mean() {
        let vectors = vec![vec![1.0, 0.0], vec![3.0, 2.0], vec![2.0, 4.0]];
        let centroids = cluster(&vectors, 1, 42);
        assert_eq!(centroids.len(), 1);
        assert!(close(&centroids[0], &[2.0, 2.0]));
    }

    #[test]
    fn test_single_vector_returns_itself() {
        let vectors = vec![vec![0.5, 0.5, 0.5]];
        let centroids = cluster(&vectors, 3, 42);
        assert_eq!(centroids.len(), 1);
        assert!(close(&centroids[0], &[0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let vectors: Vec<Embedding> = (0..12)
            .map(|i| vec![(i % 3) as f32, (i % 4) as f32, i as f32 * 0.1])
            .collect();
        let first = cluster(&vectors, 3, 42);
        let second = cluster(&vectors, 3, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_k_capped_at_input_size() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let centroids = cluster(&vectors, 5, 42);
        assert_eq!(centroids.len(), 2);
    }

    #[test]
    fn test_separates_obvious_groups() {
        // Two well-separated direction groups: each must get a centroid
        // close to its own mean.
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![1.0, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
            vec![0.1, 1.0],
        ];
        let centroids = cluster(&vectors, 2, 7);
        assert_eq!(centroids.len(), 2);

        let x_heavy = centroids.iter().any(|c| c[0] > 0.8 && c[1] < 0.2);
        let y_heavy = centroids.iter().any(|c| c[1] > 0.8 && c[0] < 0.2);
        assert!(x_heavy, "expected a centroid near the x group: {centroids:?}");
        assert!(y_heavy, "expected a centroid near the y group: {centroids:?}");
    }

    #[test]
    fn test_identical_points_terminate() {
        let vectors = vec![vec![1.0, 1.0]; 6];
        let centroids = cluster(&vectors, 2, 42);
        assert_eq!(centroids.len(), 2);
        for centroid in &centroids {
            assert!(close(centroid, &[1.0, 1.0]));
        }
    }
}
