//! Declarative retention policy documents.
//!
//! A policy is produced and stored by the API layer; the engine receives it
//! already parsed. The serde shape follows the registry's JSON form:
//!
//! ```json
//! {
//!   "algorithm": "or",
//!   "rules": [{
//!     "priority": 1,
//!     "action": "retain",
//!     "template": "latestPushedK",
//!     "params": { "latestPushedK": 10 },
//!     "tag_selectors": [{ "kind": "doublestar", "decoration": "matches", "pattern": "**" }],
//!     "scope_selectors": [{ "kind": "repository", "decoration": "repoMatches", "pattern": "**" }]
//!   }]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RetentionError};

/// Whether a selector keeps or drops the candidates its pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decoration {
    #[serde(alias = "repoMatches", alias = "withLabels")]
    Matches,
    #[serde(alias = "repoExcludes", alias = "withoutLabels")]
    Excludes,
}

impl Decoration {
    /// Apply the decoration to a raw predicate result.
    pub fn keeps(self, matched: bool) -> bool {
        match self {
            Decoration::Matches => matched,
            Decoration::Excludes => !matched,
        }
    }
}

/// One narrowing step of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub kind: String,
    pub decoration: Decoration,
    #[serde(default)]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

impl SelectorSpec {
    pub fn new(kind: &str, decoration: Decoration, pattern: &str) -> Self {
        Self {
            kind: kind.to_string(),
            decoration,
            pattern: pattern.to_string(),
            extras: None,
        }
    }
}

/// One retention rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Reporting order only; combination never consults it.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub disabled: bool,
    pub action: String,
    pub template: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub tag_selectors: Vec<SelectorSpec>,
    /// Selectors that decide which candidates the rule governs at all.
    #[serde(default)]
    pub scope_selectors: Vec<SelectorSpec>,
}

impl Rule {
    /// A `retain` rule with no selectors.
    pub fn retain(template: &str) -> Self {
        Self {
            id: None,
            priority: 0,
            disabled: false,
            action: "retain".to_string(),
            template: template.to_string(),
            params: BTreeMap::new(),
            tag_selectors: Vec::new(),
            scope_selectors: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_tag_selector(mut self, selector: SelectorSpec) -> Self {
        self.tag_selectors.push(selector);
        self
    }

    pub fn with_scope_selector(mut self, selector: SelectorSpec) -> Self {
        self.scope_selectors.push(selector);
        self
    }
}

/// The level a policy is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Currently always `project`.
    pub level: String,
    /// Project ID at that level.
    pub reference: i64,
}

/// A project's retention policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

impl PolicyMetadata {
    /// An `or` policy over the given rules.
    pub fn or(rules: Vec<Rule>) -> Self {
        Self {
            id: None,
            algorithm: "or".to_string(),
            rules,
            scope: None,
        }
    }

    /// Structural validation; name resolution happens in the builder.
    pub fn validate(&self, max_rules: usize) -> Result<()> {
        if self.algorithm.trim().is_empty() {
            return Err(RetentionError::MissingAlgorithm);
        }
        if self.rules.len() > max_rules {
            return Err(RetentionError::InvalidPolicy(format!(
                "{} rules exceeds the limit of {max_rules}",
                self.rules.len()
            )));
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.template.trim().is_empty() {
                return Err(RetentionError::InvalidPolicy(format!(
                    "rule {index} has no template"
                )));
            }
            if rule.action.trim().is_empty() {
                return Err(RetentionError::InvalidPolicy(format!(
                    "rule {index} has no action"
                )));
            }
        }
        Ok(())
    }

    /// Enabled rules with their declaration index, ordered by priority.
    ///
    /// Ties keep declaration order.
    pub fn rules_by_priority(&self) -> Vec<(usize, &Rule)> {
        let mut rules: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.disabled)
            .collect();
        rules.sort_by_key(|(index, r)| (r.priority, *index));
        rules
    }
}
