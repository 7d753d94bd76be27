//! Error types for the policy plugins.

use thiserror::Error;

use semgate_embeddings::EmbeddingError;
use semgate_matching::MatchError;

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors surfaced by the policy plugins.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Invalid plugin configuration, raised at initialization.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Matcher construction rejected the configuration.
    #[error("matcher error: {0}")]
    Match(#[from] MatchError),
}
