//! Candidate selection policies: top-K and threshold filtering.
//!
//! Used by the tool-filtering plugin: every candidate is scored by cosine
//! similarity against the query, then either the `limit` highest scores or
//! everything above a configured floor is kept.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use semgate_embeddings::Embedding;
use semgate_embeddings::vector::cosine_similarity;

use crate::error::{MatchError, Result};

/// How the tool filter selects candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SelectionMode {
    /// Keep the `limit` highest-scoring candidates.
    TopK { limit: usize },

    /// Keep every candidate scoring at least `min_score` (0.0 to 1.0).
    Threshold { min_score: f32 },
}

impl SelectionMode {
    /// Validate the mode at configuration time.
    pub fn validate(&self) -> Result<()> {
        match *self {
            SelectionMode::TopK { limit } => {
                if limit == 0 {
                    return Err(MatchError::ZeroLimit);
                }
            }
            SelectionMode::Threshold { min_score } => {
                if !(0.0..=1.0).contains(&min_score) || min_score.is_nan() {
                    return Err(MatchError::ThresholdOutOfRange {
                        value: min_score,
                        min: 0.0,
                        max: 1.0,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    /// Identifier of the candidate (e.g. a tool name).
    pub id: String,

    /// Cosine similarity to the query.
    pub score: f32,
}

impl Scored {
    /// Create a new scored candidate.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Apply a selection mode to `(id, vector)` candidates.
///
/// Top-K results are ordered by descending score; ties keep the input
/// order (stable sort). Threshold results keep the input order.
pub fn select(
    query: &Embedding,
    candidates: &[(String, Embedding)],
    mode: &SelectionMode,
) -> Vec<Scored> {
    match *mode {
        SelectionMode::TopK { limit } => top_k(query, candidates, limit),
        SelectionMode::Threshold { min_score } => by_threshold(query, candidates, min_score),
    }
}

/// Return the `limit` highest-scoring candidates in descending order.
pub fn top_k(query: &Embedding, candidates: &[(String, Embedding)], limit: usize) -> Vec<Scored> {
    let mut scored: Vec<(OrderedFloat<f32>, &str)> = candidates
        .iter()
        .map(|(id, vector)| (OrderedFloat(cosine_similarity(query, vector)), id.as_str()))
        .collect();

    // Stable sort keeps input order for tied scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(score, id)| Scored::new(id, score.0))
        .collect()
}

/// Return every candidate scoring at least `min_score`, in input order.
pub fn by_threshold(
    query: &Embedding,
    candidates: &[(String, Embedding)],
    min_score: f32,
) -> Vec<Scored> {
    candidates
        .iter()
        .filter_map(|(id, vector)| {
            let score = cosine_similarity(query, vector);
            if score >= min_score {
                Some(Scored::new(id.clone(), score))
            } else {
                None
            }
        })
        .collect()
}
