//! Rule templates: named retention heuristics.
//!
//! A template is resolved by name and bound to its rule parameters, producing
//! an [`Evaluator`] that picks which of a (selector-narrowed) candidate set to
//! retain. Evaluators are deterministic for a fixed input set: ordering ties
//! are broken by candidate identity, never by input position.
//!
//! # Modules
//!
//! - [`basic`]: `always`, `nothing`
//! - [`latest`]: `latestPushedK`, `latestPulledN`, `latestActiveK`
//! - [`days`]: `nDaysSinceLastPush`, `nDaysSinceLastPull`

pub mod basic;
pub mod days;
pub mod latest;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::candidate::Candidate;
use crate::error::ParameterError;
use crate::registry::Registry;

/// A template bound to its parameters.
pub trait Evaluator: Send + Sync + std::fmt::Debug {
    /// Template name this evaluator was built from.
    fn template(&self) -> &str;

    /// The retained subset of `candidates`, in input order.
    fn evaluate<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate>;
}

/// Template parameters as they appear in the policy document.
pub type Parameters = BTreeMap<String, Value>;

/// Run-scoped inputs a template may depend on.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext {
    /// Fixed evaluation instant for age-based templates.
    pub now: DateTime<Utc>,
}

pub type TemplateFactory =
    fn(&Parameters, &TemplateContext) -> Result<Box<dyn Evaluator>, ParameterError>;

pub type TemplateRegistry = Registry<TemplateFactory>;

impl Registry<TemplateFactory> {
    /// Registry holding the built-in templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        basic::register(&mut registry);
        latest::register(&mut registry);
        days::register(&mut registry);
        registry
    }
}

/// Read a non-negative integer parameter.
///
/// Numeric strings are accepted since older policy documents store counts as
/// strings.
pub fn count_param(params: &Parameters, key: &str) -> Result<u64, ParameterError> {
    let value = params.get(key).ok_or_else(|| ParameterError::Missing {
        key: key.to_string(),
    })?;
    let invalid = |reason: String| ParameterError::Invalid {
        key: key.to_string(),
        reason,
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("{n} is not a non-negative integer"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid(format!("'{s}' is not a non-negative integer"))),
        other => Err(invalid(format!("expected an integer, got {other}"))),
    }
}

/// Keep `input` entries whose identity is in `chosen`, preserving input order.
pub(crate) fn in_input_order<'a>(
    input: &[&'a Candidate],
    chosen: &[&'a Candidate],
) -> Vec<&'a Candidate> {
    let chosen: HashSet<&Candidate> = chosen.iter().copied().collect();
    input
        .iter()
        .copied()
        .filter(|c| chosen.contains(c))
        .collect()
}
