//! Semantic prompt guarding.
//!
//! Blocks or permits a prompt by similarity against configured allow/deny
//! reference texts. The rules are embedded once at initialization; each
//! request only embeds the incoming prompt.

use std::sync::Arc;

use tracing::info;

use semgate_embeddings::EmbeddingProvider;
use semgate_matching::{GuardRule, GuardVerdict, RuleSet};

use crate::config::PromptGuardConfig;
use crate::error::{PolicyError, Result};

/// The prompt-guard plugin.
pub struct PromptGuard<P> {
    provider: Arc<P>,
    rules: RuleSet,
}

impl<P: EmbeddingProvider> PromptGuard<P> {
    /// Build the guard, embedding every rule text once.
    ///
    /// Fails fast on an empty rule list, an out-of-range threshold, or a
    /// provider failure — the guard never starts half-configured.
    pub async fn new(provider: Arc<P>, config: PromptGuardConfig) -> Result<Self> {
        if provider.dimension() == 0 {
            return Err(PolicyError::InvalidConfig(
                "embedding provider reports zero dimension".to_string(),
            ));
        }

        let texts: Vec<String> = config.rules.iter().map(|r| r.text.clone()).collect();
        let vectors = provider.embed_batch(&texts).await?;

        let rules: Vec<GuardRule> = config
            .rules
            .into_iter()
            .zip(vectors)
            .map(|(rule, vector)| GuardRule {
                text: rule.text,
                vector,
                action: rule.action,
                threshold: rule.threshold,
            })
            .collect();

        let rules = RuleSet::new(rules)?;
        info!(mode = ?rules.mode(), "prompt guard initialized");
        Ok(Self { provider, rules })
    }

    /// Evaluate a prompt against the rule set.
    pub async fn evaluate(&self, prompt: &str) -> Result<GuardVerdict> {
        let query = self.provider.embed(prompt).await?;
        Ok(self.rules.evaluate(&query))
    }
}
