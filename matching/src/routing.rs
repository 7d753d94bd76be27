//! Semantic route matching with a confidence-gap margin.
//!
//! Each route carries a small set of centroid prototypes produced by
//! [`crate::clustering`]. A query matches the route whose centroids it is
//! closest to, but only when that score clears the route's threshold AND
//! leads the runner-up by a minimum gap. The margin prevents flapping
//! between two near-tied routes on borderline queries; when either check
//! fails the caller falls back to its configured default route instead of
//! guessing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use semgate_embeddings::Embedding;
use semgate_embeddings::vector::cosine_similarity;

use crate::clustering::{cluster, optimal_k};
use crate::error::{MatchError, Result};

/// Default required lead over the second-best route.
pub const DEFAULT_CONFIDENCE_GAP: f32 = 0.05;

/// One semantic route with its centroid prototypes.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route label handed back to the caller on a match.
    pub label: String,

    /// Minimum score (0.0 to 1.0) for this route to match.
    pub threshold: f32,

    /// Centroid prototypes; immutable after construction.
    pub centroids: Vec<Embedding>,

    /// Opaque metadata (target model, endpoint) carried for the caller.
    pub metadata: Option<serde_json::Value>,
}

impl Route {
    /// Build a route from raw reference vectors.
    ///
    /// The references are clustered into `optimal_k` centroids with the
    /// given seed; the references themselves are not retained.
    pub fn from_references(
        label: impl Into<String>,
        references: &[Embedding],
        threshold: f32,
        seed: u64,
    ) -> Result<Self> {
        let label = label.into();
        if references.is_empty() {
            return Err(MatchError::EmptyRoute { label });
        }
        validate_unit_threshold(threshold)?;

        let k = optimal_k(references.len());
        let centroids = cluster(references, k, seed);
        debug!(route = %label, references = references.len(), centroids = centroids.len(),
            "clustered route references");

        Ok(Self {
            label,
            threshold,
            centroids,
            metadata: None,
        })
    }

    /// Attach metadata to the route.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Best cosine similarity between the query and any centroid.
    fn score(&self, query: &Embedding) -> f32 {
        self.centroids
            .iter()
            .map(|c| cosine_similarity(query, c))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// A selected route and its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Label of the matched route.
    pub label: String,

    /// The winning score.
    pub score: f32,
}

/// The read-only set of routes a query is matched against.
///
/// Built once at initialization and rebuilt wholesale on configuration
/// change; matching only reads, so the table is shared without locks.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    min_confidence_gap: f32,
}

impl RouteTable {
    /// Create a table from prebuilt routes.
    pub fn new(routes: Vec<Route>, min_confidence_gap: f32) -> Result<Self> {
        if routes.is_empty() {
            return Err(MatchError::EmptyRouteTable);
        }
        validate_unit_threshold(min_confidence_gap)?;
        for route in &routes {
            if route.centroids.is_empty() {
                return Err(MatchError::EmptyRoute {
                    label: route.label.clone(),
                });
            }
            validate_unit_threshold(route.threshold)?;
        }
        Ok(Self {
            routes,
            min_confidence_gap,
        })
    }

    /// Number of routes in the table.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes (never true after construction).
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up a route by label.
    pub fn route(&self, label: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.label == label)
    }

    /// Select the best route for a query, if one wins convincingly.
    ///
    /// Scores every route as the max similarity over its centroids, then
    /// accepts the best route only if it clears that route's threshold and
    /// leads the second-best score by at least the confidence gap.
    pub fn select(&self, query: &Embedding) -> Option<RouteMatch> {
        let mut best: Option<(usize, f32)> = None;
        let mut second_best = f32::NEG_INFINITY;

        for (i, route) in self.routes.iter().enumerate() {
            let score = route.score(query);
            match best {
                Some((_, best_score)) if score <= best_score => {
                    second_best = second_best.max(score);
                }
                _ => {
                    if let Some((_, prev)) = best {
                        second_best = second_best.max(prev);
                    }
                    best = Some((i, score));
                }
            }
        }

        let (index, score) = best?;
        let route = &self.routes[index];

        if score < route.threshold {
            debug!(route = %route.label, score, threshold = route.threshold,
                "best route below threshold");
            return None;
        }
        if score - second_best < self.min_confidence_gap {
            debug!(route = %route.label, score, second_best,
                gap = self.min_confidence_gap, "margin too small, not routing");
            return None;
        }

        debug!(route = %route.label, score, "route selected");
        Some(RouteMatch {
            label: route.label.clone(),
            score,
        })
    }
}

fn validate_unit_threshold(value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(MatchError::ThresholdOutOfRange {
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn route(label: &str, centroid: Embedding, threshold: f32) -> Route {
        Route {
            label: label.to_string(),
            threshold,
            centroids: vec![centroid],
            metadata: None,
        }
    }

    #[test]
    fn test_selects_clear_winner() {
        let table = RouteTable::new(
            vec![
                route("billing", vec![1.0, 0.0], 0.8),
                route("support", vec![0.0, 1.0], 0.8),
            ],
            0.05,
        )
        .unwrap();

        let matched = table.select(&vec![0.95, 0.05]).expect("should route");
        assert_eq!(matched.label, "billing");
        assert!(matched.score > 0.9);
    }

    #[test]
    fn test_margin_rejects_near_tie() {
        // Both routes score high (0.91 vs 0.89 style); the 0.05 gap is not
        // met, so no route is selected.
        let table = RouteTable::new(
            vec![
                route("a", vec![1.0, 0.40], 0.8),
                route("b", vec![1.0, 0.48], 0.8),
            ],
            0.05,
        )
        .unwrap();

        let query = vec![1.0, 0.44];
        assert!(table.select(&query).is_none());
    }

    #[test]
    fn test_threshold_rejects_weak_best() {
        let table = RouteTable::new(vec![route("a", vec![1.0, 0.0], 0.9)], 0.05).unwrap();
        // Similarity ~0.71, below the 0.9 threshold.
        assert!(table.select(&vec![1.0, 1.0]).is_none());
    }

    #[test]
    fn test_single_route_needs_no_margin() {
        let table = RouteTable::new(vec![route("only", vec![1.0, 0.0], 0.8)], 0.05).unwrap();
        let matched = table.select(&vec![1.0, 0.1]).expect("should route");
        assert_eq!(matched.label, "only");
    }

    #[test]
    fn test_max_over_centroids() {
        let multi = Route {
            label: "multi".to_string(),
            threshold: 0.8,
            centroids: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            metadata: None,
        };
        let table = RouteTable::new(vec![multi], 0.05).unwrap();
        let matched = table.select(&vec![1.0, 0.05]).expect("should route");
        assert!(matched.score > 0.9);
    }

    #[test]
    fn test_from_references_clusters() {
        let references = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
            vec![0.5, 0.5],
        ];
        let route = Route::from_references("r", &references, 0.7, 42).unwrap();
        assert_eq!(route.centroids.len(), optimal_k(references.len()));
    }

    #[test]
    fn test_configuration_validation() {
        assert!(RouteTable::new(vec![], 0.05).is_err());
        assert!(RouteTable::new(vec![route("a", vec![1.0], 1.5)], 0.05).is_err());
        assert!(Route::from_references("empty", &[], 0.5, 42).is_err());
    }
}
