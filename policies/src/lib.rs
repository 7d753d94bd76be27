//! # Semgate Policies
//!
//! The three semantic gateway plugins, wired from the embedding layer and
//! the matchers:
//!
//! - [`ToolFilter`]: keeps only the tools semantically relevant to a query,
//!   by rank or by threshold, caching tool embeddings per collection.
//! - [`PromptGuard`]: allows or blocks a prompt against allow/deny rules.
//! - [`SemanticRouter`]: picks the best route for a query, falling back to
//!   a configured default when no route wins convincingly.
//!
//! Each plugin embeds its reference texts once at initialization and is
//! read-only afterwards; a configuration change rebuilds the plugin
//! wholesale. Provider failures propagate typed to the host, which decides
//! between passthrough and block — no retries happen here.

pub mod config;
pub mod error;
pub mod prompt_guard;
pub mod router;
pub mod tool_filter;

pub use config::{
    CacheConfig, GuardRuleConfig, PromptGuardConfig, RouteConfig, RouterConfig, ToolFilterConfig,
};
pub use error::{PolicyError, Result};
pub use prompt_guard::PromptGuard;
pub use router::{RouteDecision, SemanticRouter};
pub use tool_filter::{ToolDescriptor, ToolFilter};
