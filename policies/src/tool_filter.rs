//! Semantic tool filtering.
//!
//! Given a user query and the tools advertised for an API, keep only the
//! tools whose descriptions are semantically relevant to the query. Tool
//! embeddings are cached per collection; only descriptions whose content
//! hash misses the cache are sent to the provider.

use std::sync::Arc;

use tracing::debug;

use semgate_embeddings::{
    Embedding, EmbeddingCache, EmbeddingProvider, PendingEmbedding, content_hash,
};
use semgate_matching::{Scored, SelectionMode, select};

use crate::config::ToolFilterConfig;
use crate::error::{PolicyError, Result};

/// A tool advertised by an API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Unique tool name within its collection.
    pub name: String,

    /// Natural-language description matched against the query.
    pub description: String,
}

impl ToolDescriptor {
    /// Create a new descriptor.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The tool-filtering plugin.
pub struct ToolFilter<P> {
    provider: Arc<P>,
    cache: Arc<EmbeddingCache>,
    mode: SelectionMode,
}

impl<P: EmbeddingProvider> ToolFilter<P> {
    /// Create a filter, validating the selection mode up front.
    pub fn new(
        provider: Arc<P>,
        cache: Arc<EmbeddingCache>,
        config: ToolFilterConfig,
    ) -> Result<Self> {
        config.mode.validate()?;
        if provider.dimension() == 0 {
            return Err(PolicyError::InvalidConfig(
                "embedding provider reports zero dimension".to_string(),
            ));
        }
        Ok(Self {
            provider,
            cache,
            mode: config.mode,
        })
    }

    /// Filter `tools` down to the ones relevant to `query`.
    ///
    /// Cached description embeddings are reused; misses are embedded in one
    /// batch (outside any cache lock) and offered back to the cache. Tools
    /// the cache skips for capacity are still scored with their freshly
    /// computed vectors — a full cache degrades to re-embedding, never to
    /// wrong results.
    pub async fn filter(
        &self,
        collection: &str,
        query: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Vec<Scored>> {
        if tools.is_empty() {
            return Ok(Vec::new());
        }

        let hashes: Vec<String> = tools
            .iter()
            .map(|tool| content_hash(&tool.description))
            .collect();

        let mut vectors: Vec<Option<Embedding>> = Vec::with_capacity(tools.len());
        for hash in &hashes {
            vectors.push(self.cache.get(collection, hash).await.map(|e| e.vector));
        }

        let missing: Vec<usize> = (0..tools.len()).filter(|&i| vectors[i].is_none()).collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing
                .iter()
                .map(|&i| tools[i].description.clone())
                .collect();
            let embedded = self.provider.embed_batch(&texts).await?;

            let mut pending = Vec::with_capacity(missing.len());
            for (&i, vector) in missing.iter().zip(embedded) {
                pending.push(PendingEmbedding::new(
                    hashes[i].clone(),
                    tools[i].name.clone(),
                    vector.clone(),
                ));
                vectors[i] = Some(vector);
            }

            let outcome = self.cache.bulk_put(collection, pending).await;
            debug!(
                collection = %collection,
                cached = outcome.cached.len(),
                added = outcome.added.len(),
                skipped = outcome.skipped.len(),
                "stored tool embeddings"
            );
        }

        let query_vector = self.provider.embed(query).await?;

        let candidates: Vec<(String, Embedding)> = tools
            .iter()
            .zip(vectors)
            .filter_map(|(tool, vector)| vector.map(|v| (tool.name.clone(), v)))
            .collect();

        Ok(select(&query_vector, &candidates, &self.mode))
    }
}
