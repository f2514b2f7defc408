use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Category, CategorySuggestion, Transaction};
use crate::ports::{CategorizationProvider, ProviderError};
use crate::types::{CategoryId, ConfidenceError, ConfidenceScore};

const DEFAULT_RULE_CONFIDENCE: f64 = 0.9;

/// Keyword rule mapping matching transactions to a category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRule {
    /// Case-insensitive text looked for in the description and counterparty name.
    pub pattern: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_amount: Option<Decimal>
}

fn default_confidence() -> f64 {
    DEFAULT_RULE_CONFIDENCE
}

struct CompiledRule {
    rule: CategoryRule,
    pattern: String,
    confidence: ConfidenceScore
}

/// Deterministic categorization strategy built from keyword rules, highest priority first.
pub struct RuleCategorizer {
    rules: Vec<CompiledRule>
}

impl RuleCategorizer {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, ConfidenceError> {
        let mut compiled = rules.into_iter()
            .map(|rule| -> Result<CompiledRule, ConfidenceError> {
                Ok(CompiledRule {
                    pattern: rule.pattern.trim().to_lowercase(),
                    confidence: ConfidenceScore::new(rule.confidence)?,
                    rule
                })
            })
            .collect::<Result<Vec<_>, ConfidenceError>>()?;

        //NOTE: sort_by is stable, rules with equal priority keep their configured order
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));

        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn find_matching_rule(&self, transaction: &Transaction, categories: &[Category]) -> Option<&CompiledRule> {
        let description = transaction.description.to_lowercase();
        let counterparty = transaction.counterparty_name.as_deref().unwrap_or_default().to_lowercase();
        let amount = transaction.amount.amount();

        self.rules.iter()
            .filter(|compiled| !compiled.pattern.is_empty())
            .filter(|compiled| compiled.rule.min_amount.is_none_or(|min| amount >= min))
            .filter(|compiled| compiled.rule.max_amount.is_none_or(|max| amount <= max))
            .filter(|compiled| description.contains(&compiled.pattern) || counterparty.contains(&compiled.pattern))
            .find(|compiled| {
                let known = categories.iter().any(|category| category.id == compiled.rule.category_id);

                if !known {
                    warn!("Rule [{}] points at unknown category [{}]", compiled.rule.pattern, compiled.rule.category_id);
                }

                known
            })
    }
}

impl CategorizationProvider for RuleCategorizer {
    async fn suggest_category(&self, transaction: &Transaction, categories: &[Category]) -> Result<Option<CategorySuggestion>, ProviderError> {
        let Some(compiled) = self.find_matching_rule(transaction, categories) else {
            debug!("No rule matched transaction [{}]", transaction.id);
            return Ok(None);
        };

        Ok(Some(CategorySuggestion {
            category_id: compiled.rule.category_id.clone(),
            confidence: Some(compiled.confidence),
            reasoning: Some(format!("Matched rule '{}'", compiled.rule.pattern)),
            payee: compiled.rule.payee.clone(),
            memo: compiled.rule.memo.clone()
        }))
    }
}
