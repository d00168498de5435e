//! Label selector: admits candidates carrying any of a required label set.
//!
//! The pattern is a comma-separated list of label IDs (`"3,7"`); extras may
//! add more under `{"labels": [..]}`. An empty required set matches every
//! candidate, so `matches` passes everything through and `excludes` drops
//! everything.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::candidate::Candidate;
use crate::error::ParameterError;
use crate::policy::Decoration;

use super::{Selector, SelectorRegistry};

pub const KIND_LABEL: &str = "label";

#[derive(Debug, Clone)]
pub struct LabelSelector {
    decoration: Decoration,
    required: BTreeSet<i64>,
}

impl LabelSelector {
    pub fn new(decoration: Decoration, required: BTreeSet<i64>) -> Self {
        Self {
            decoration,
            required,
        }
    }

    fn matches(&self, candidate: &Candidate) -> bool {
        self.required.is_empty() || !self.required.is_disjoint(&candidate.labels)
    }
}

impl Selector for LabelSelector {
    fn kind(&self) -> &str {
        KIND_LABEL
    }

    fn select<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        candidates
            .iter()
            .copied()
            .filter(|c| self.decoration.keeps(self.matches(c)))
            .collect()
    }
}

fn parse_ids(pattern: &str, extras: Option<&Value>) -> Result<BTreeSet<i64>, ParameterError> {
    let mut ids = BTreeSet::new();
    for part in pattern.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part.parse::<i64>().map_err(|_| ParameterError::Invalid {
            key: "pattern".into(),
            reason: format!("'{part}' is not a label ID"),
        })?;
        ids.insert(id);
    }

    if let Some(labels) = extras.and_then(|e| e.get("labels")) {
        let list = labels.as_array().ok_or_else(|| ParameterError::Invalid {
            key: "labels".into(),
            reason: "expected an array of label IDs".into(),
        })?;
        for v in list {
            let id = v.as_i64().ok_or_else(|| ParameterError::Invalid {
                key: "labels".into(),
                reason: format!("{v} is not a label ID"),
            })?;
            ids.insert(id);
        }
    }
    Ok(ids)
}

fn factory(
    decoration: Decoration,
    pattern: &str,
    extras: Option<&Value>,
) -> Result<Box<dyn Selector>, ParameterError> {
    Ok(Box::new(LabelSelector::new(
        decoration,
        parse_ids(pattern, extras)?,
    )))
}

pub fn register(registry: &mut SelectorRegistry) {
    registry.register(KIND_LABEL, factory);
}
