//! # Semgate Embeddings
//!
//! This crate provides the embedding layer shared by the semantic gateway
//! policies: vector math, content hashing, a bounded two-level embedding
//! cache, and the external embedding-provider contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Embedding Layer                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► EmbeddingCache             │
//! │       │                    │              │                     │
//! │       ▼                    ▼              ▼                     │
//! │  HTTP backend         vector math    per-collection LRU        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is shared by every in-flight request of a process; the
//! provider is only called for content whose hash is not already cached.

pub mod cache;
pub mod error;
pub mod provider;
pub mod vector;

pub use cache::{BulkPutOutcome, CachedEmbedding, EmbeddingCache, PendingEmbedding, content_hash};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, HttpProvider};
pub use vector::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default embedding dimension (text-embedding-3-small).
pub const DEFAULT_DIMENSION: usize = 1536;
