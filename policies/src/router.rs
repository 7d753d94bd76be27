//! Semantic routing.
//!
//! Routes a query to the semantically closest configured route, or to the
//! configured default route when no candidate wins convincingly. Reference
//! utterances are embedded and clustered into centroids once at
//! initialization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use semgate_embeddings::EmbeddingProvider;
use semgate_matching::{Route, RouteTable};

use crate::config::RouterConfig;
use crate::error::{PolicyError, Result};

/// The routing outcome handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// The selected route label (a configured route or the default).
    pub route: String,

    /// Confidence score of a positive match.
    pub score: Option<f32>,

    /// Whether a route matched or the default was used.
    pub matched: bool,
}

/// The semantic-routing plugin.
pub struct SemanticRouter<P> {
    provider: Arc<P>,
    table: RouteTable,
    default_route: String,
}

impl<P: EmbeddingProvider> SemanticRouter<P> {
    /// Build the router: embed every route's references and cluster them
    /// into centroid prototypes with the configured seed.
    pub async fn new(provider: Arc<P>, config: RouterConfig) -> Result<Self> {
        if provider.dimension() == 0 {
            return Err(PolicyError::InvalidConfig(
                "embedding provider reports zero dimension".to_string(),
            ));
        }
        if config.default_route.is_empty() {
            return Err(PolicyError::InvalidConfig(
                "default route must not be empty".to_string(),
            ));
        }

        let mut routes = Vec::with_capacity(config.routes.len());
        for route_config in config.routes {
            let references = provider.embed_batch(&route_config.reference_texts).await?;
            let mut route = Route::from_references(
                route_config.label,
                &references,
                route_config.threshold,
                config.clustering_seed,
            )?;
            if let Some(metadata) = route_config.metadata {
                route = route.with_metadata(metadata);
            }
            routes.push(route);
        }

        let table = RouteTable::new(routes, config.min_confidence_gap)?;
        info!(routes = table.len(), "semantic router initialized");

        Ok(Self {
            provider,
            table,
            default_route: config.default_route,
        })
    }

    /// Route a query.
    pub async fn route(&self, query: &str) -> Result<RouteDecision> {
        let vector = self.provider.embed(query).await?;
        match self.table.select(&vector) {
            Some(matched) => Ok(RouteDecision {
                route: matched.label,
                score: Some(matched.score),
                matched: true,
            }),
            None => {
                debug!(default = %self.default_route, "no convincing route, using default");
                Ok(RouteDecision {
                    route: self.default_route.clone(),
                    score: None,
                    matched: false,
                })
            }
        }
    }
}
