//! Configuration surface for the policy plugins.
//!
//! All configuration is validated when a plugin is constructed; a plugin
//! never starts serving requests with an invalid setup.

use serde::{Deserialize, Serialize};

use semgate_embeddings::cache::{DEFAULT_MAX_COLLECTIONS, DEFAULT_MAX_ENTRIES_PER_COLLECTION};
use semgate_matching::routing::DEFAULT_CONFIDENCE_GAP;
use semgate_matching::{RuleAction, SelectionMode};

/// Limits for the shared embedding cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of collections.
    pub max_collections: usize,

    /// Maximum number of entries per collection.
    pub max_entries_per_collection: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_collections: DEFAULT_MAX_COLLECTIONS,
            max_entries_per_collection: DEFAULT_MAX_ENTRIES_PER_COLLECTION,
        }
    }
}

/// Configuration for the tool-filtering plugin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolFilterConfig {
    /// How candidates are selected.
    pub mode: SelectionMode,
}

/// One configured guard rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRuleConfig {
    /// Reference text describing permitted or forbidden content.
    pub text: String,

    /// Allow or deny.
    pub action: RuleAction,

    /// Minimum score (0 to 100) for the rule to fire.
    pub threshold: f32,
}

/// Configuration for the prompt-guard plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptGuardConfig {
    /// The rule list, evaluated deny-before-allow in this order.
    pub rules: Vec<GuardRuleConfig>,
}

/// One configured semantic route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route label handed back to the host on a match.
    pub label: String,

    /// Reference utterances, embedded and clustered at initialization.
    pub reference_texts: Vec<String>,

    /// Minimum score (0.0 to 1.0) for this route to match.
    pub threshold: f32,

    /// Opaque metadata (target model, endpoint) for the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Configuration for the semantic-routing plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The routes a query is matched against.
    pub routes: Vec<RouteConfig>,

    /// Label used when no route wins convincingly.
    pub default_route: String,

    /// Required lead over the second-best route.
    #[serde(default = "default_confidence_gap")]
    pub min_confidence_gap: f32,

    /// Seed for reproducible reference clustering.
    #[serde(default)]
    pub clustering_seed: u64,
}

fn default_confidence_gap() -> f32 {
    DEFAULT_CONFIDENCE_GAP
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_router_config_defaults() {
        let json = serde_json::json!({
            "routes": [
                { "label": "billing", "reference_texts": ["refund my order"], "threshold": 0.8 }
            ],
            "default_route": "general",
        });
        let config: RouterConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.min_confidence_gap, DEFAULT_CONFIDENCE_GAP);
        assert_eq!(config.clustering_seed, 0);
        assert_eq!(config.routes[0].metadata, None);
    }

    #[test]
    fn test_selection_mode_round_trip() {
        let config = ToolFilterConfig {
            mode: SelectionMode::TopK { limit: 5 },
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ToolFilterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
