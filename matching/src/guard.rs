//! Allow/deny rule evaluation for the semantic prompt guard.
//!
//! Rules score on a 0-100 scale (`cosine * 100`), unlike the 0-1 scale of
//! the selection and routing matchers. The scale difference is inherited
//! from the operator-facing configuration and is kept as-is; normalizing it
//! would silently change the meaning of configured thresholds.
//!
//! Evaluation order is fixed: deny rules first, then allow rules, each in
//! configuration order, and the first rule whose score clears its threshold
//! decides the outcome. In hybrid mode a text similar to both an allow and
//! a deny rule is therefore blocked, because the deny rule is consulted
//! first. This is not a highest-score-wins evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use semgate_embeddings::Embedding;
use semgate_embeddings::vector::cosine_similarity;

use crate::error::{MatchError, Result};

/// Whether a rule permits or blocks matching content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Matching content is permitted.
    Allow,
    /// Matching content is blocked.
    Deny,
}

/// A single guard rule with its reference embedding.
#[derive(Debug, Clone)]
pub struct GuardRule {
    /// The reference text the rule was built from, reported on a match.
    pub text: String,

    /// Embedding of the reference text.
    pub vector: Embedding,

    /// Allow or deny.
    pub action: RuleAction,

    /// Minimum score (0 to 100) for this rule to fire.
    pub threshold: f32,
}

/// Which rule categories were configured. Derived once at construction and
/// fixed for the matcher's lifetime; decides the no-match default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Only deny rules: a blocklist, unmatched content is allowed.
    DenyOnly,
    /// Only allow rules: an allowlist, unmatched content is denied.
    AllowOnly,
    /// Both kinds of rules: unmatched content is denied.
    Hybrid,
}

/// The result of evaluating a query against a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardVerdict {
    /// Whether the content is allowed through.
    pub allowed: bool,

    /// Text of the rule that decided the outcome, if any rule fired.
    pub matched_rule: Option<String>,

    /// Score of the deciding rule (0 to 100 scale).
    pub score: Option<f32>,
}

impl GuardVerdict {
    fn default_for(mode: GuardMode) -> Self {
        Self {
            allowed: mode == GuardMode::DenyOnly,
            matched_rule: None,
            score: None,
        }
    }
}

/// An immutable set of guard rules, split by category at construction.
#[derive(Debug, Clone)]
pub struct RuleSet {
    deny: Vec<GuardRule>,
    allow: Vec<GuardRule>,
    mode: GuardMode,
}

impl RuleSet {
    /// Build a rule set, validating every threshold.
    ///
    /// Rules keep their configuration order within each category. Fails on
    /// an empty rule list or a threshold outside 0..=100.
    pub fn new(rules: Vec<GuardRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(MatchError::EmptyRuleSet);
        }
        for rule in &rules {
            if !(0.0..=100.0).contains(&rule.threshold) || rule.threshold.is_nan() {
                return Err(MatchError::ThresholdOutOfRange {
                    value: rule.threshold,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }

        let (deny, allow): (Vec<GuardRule>, Vec<GuardRule>) = rules
            .into_iter()
            .partition(|rule| rule.action == RuleAction::Deny);

        let mode = match (deny.is_empty(), allow.is_empty()) {
            (false, true) => GuardMode::DenyOnly,
            (true, false) => GuardMode::AllowOnly,
            _ => GuardMode::Hybrid,
        };

        Ok(Self { deny, allow, mode })
    }

    /// The mode derived from the configured rule categories.
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Evaluate a query embedding against the rules.
    ///
    /// Deny rules are consulted before allow rules; the first qualifying
    /// match wins. With no match the verdict falls back to the mode's
    /// default: allow for a pure blocklist, deny otherwise.
    pub fn evaluate(&self, query: &Embedding) -> GuardVerdict {
        for rule in &self.deny {
            let score = cosine_similarity(query, &rule.vector) * 100.0;
            if score >= rule.threshold {
                debug!(rule = %rule.text, score, "deny rule matched");
                return GuardVerdict {
                    allowed: false,
                    matched_rule: Some(rule.text.clone()),
                    score: Some(score),
                };
            }
        }

        for rule in &self.allow {
            let score = cosine_similarity(query, &rule.vector) * 100.0;
            if score >= rule.threshold {
                debug!(rule = %rule.text, score, "allow rule matched");
                return GuardVerdict {
                    allowed: true,
                    matched_rule: Some(rule.text.clone()),
                    score: Some(score),
                };
            }
        }

        GuardVerdict::default_for(self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(text: &str, vector: Embedding, action: RuleAction, threshold: f32) -> GuardRule {
        GuardRule {
            text: text.to_string(),
            vector,
            action,
            threshold,
        }
    }

    #[test]
    fn test_mode_derivation() {
        let deny_only =
            RuleSet::new(vec![rule("d", vec![1.0, 0.0], RuleAction::Deny, 80.0)]).unwrap();
        assert_eq!(deny_only.mode(), GuardMode::DenyOnly);

        let allow_only =
            RuleSet::new(vec![rule("a", vec![1.0, 0.0], RuleAction::Allow, 80.0)]).unwrap();
        assert_eq!(allow_only.mode(), GuardMode::AllowOnly);

        let hybrid = RuleSet::new(vec![
            rule("d", vec![1.0, 0.0], RuleAction::Deny, 80.0),
            rule("a", vec![0.0, 1.0], RuleAction::Allow, 80.0),
        ])
        .unwrap();
        assert_eq!(hybrid.mode(), GuardMode::Hybrid);
    }

    #[test]
    fn test_deny_only_defaults_to_allow() {
        let rules = RuleSet::new(vec![rule("d", vec![1.0, 0.0], RuleAction::Deny, 90.0)]).unwrap();
        // Orthogonal query scores 0, below every deny threshold.
        let verdict = rules.evaluate(&vec![0.0, 1.0]);
        assert!(verdict.allowed);
        assert_eq!(verdict.matched_rule, None);
    }

    #[test]
    fn test_allow_only_defaults_to_deny() {
        let rules = RuleSet::new(vec![rule("a", vec![1.0, 0.0], RuleAction::Allow, 90.0)]).unwrap();
        let verdict = rules.evaluate(&vec![0.0, 1.0]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.matched_rule, None);
    }

    #[test]
    fn test_hybrid_defaults_to_deny() {
        let rules = RuleSet::new(vec![
            rule("d", vec![1.0, 0.0], RuleAction::Deny, 90.0),
            rule("a", vec![0.0, 1.0], RuleAction::Allow, 90.0),
        ])
        .unwrap();
        let verdict = rules.evaluate(&vec![0.7, 0.7]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.matched_rule, None);
    }

    #[test]
    fn test_deny_evaluated_before_allow() {
        // The query is highly similar to both rules; deny must win because
        // it is consulted first, not because it scores higher.
        let rules = RuleSet::new(vec![
            rule("allow it", vec![1.0, 0.01], RuleAction::Allow, 80.0),
            rule("deny it", vec![1.0, 0.02], RuleAction::Deny, 80.0),
        ])
        .unwrap();
        let verdict = rules.evaluate(&vec![1.0, 0.0]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.matched_rule, Some("deny it".to_string()));
    }

    #[test]
    fn test_deny_match_blocks() {
        let rules = RuleSet::new(vec![rule("d", vec![1.0, 0.0], RuleAction::Deny, 95.0)]).unwrap();
        let verdict = rules.evaluate(&vec![1.0, 0.05]);
        assert!(!verdict.allowed);
        assert!(verdict.score.unwrap() > 95.0);
    }

    #[test]
    fn test_allow_match_permits() {
        let rules = RuleSet::new(vec![
            rule("d", vec![0.0, 1.0], RuleAction::Deny, 95.0),
            rule("a", vec![1.0, 0.0], RuleAction::Allow, 95.0),
        ])
        .unwrap();
        let verdict = rules.evaluate(&vec![1.0, 0.0]);
        assert!(verdict.allowed);
        assert_eq!(verdict.matched_rule, Some("a".to_string()));
    }

    #[test]
    fn test_threshold_scale_is_percent() {
        assert!(RuleSet::new(vec![rule("d", vec![1.0], RuleAction::Deny, 100.0)]).is_ok());
        assert!(RuleSet::new(vec![rule("d", vec![1.0], RuleAction::Deny, 101.0)]).is_err());
        assert!(RuleSet::new(vec![rule("d", vec![1.0], RuleAction::Deny, -1.0)]).is_err());
    }

    #[test]
    fn test_empty_rule_set_rejected() {
        assert!(RuleSet::new(vec![]).is_err());
    }

    #[test]
    fn test_first_qualifying_deny_wins() {
        let rules = RuleSet::new(vec![
            rule("first", vec![1.0, 0.1], RuleAction::Deny, 80.0),
            rule("second", vec![1.0, 0.0], RuleAction::Deny, 80.0),
        ])
        .unwrap();
        // Both deny rules qualify; the one listed first is reported even
        // though the second scores higher.
        let verdict = rules.evaluate(&vec![1.0, 0.0]);
        assert_eq!(verdict.matched_rule, Some("first".to_string()));
    }
}
