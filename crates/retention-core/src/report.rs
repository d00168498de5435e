//! The outcome of one retention run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::action::ActionStatus;
use crate::candidate::CandidateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Retained,
    Removed,
}

/// The decision for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub candidate: CandidateId,
    pub decision: Decision,
    /// Declaration index of the deciding rule: the first rule that retained
    /// the candidate, or for removals the first rule whose scope covered it.
    /// `None` for candidates no rule covers; those are always retained.
    pub rule_index: Option<usize>,
    /// Performer outcome, present for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalFailure {
    pub candidate: CandidateId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub dry_run: bool,
    /// Size of the candidate universe.
    pub total: usize,
    /// One record per candidate, in candidate identity order.
    pub decisions: Vec<DecisionRecord>,
    /// Removals that did not succeed, in candidate identity order.
    pub failures: Vec<RemovalFailure>,
}

impl RunReport {
    pub fn retained(&self) -> BTreeSet<&CandidateId> {
        self.with_decision(Decision::Retained)
    }

    pub fn removed(&self) -> BTreeSet<&CandidateId> {
        self.with_decision(Decision::Removed)
    }

    fn with_decision(&self, decision: Decision) -> BTreeSet<&CandidateId> {
        self.decisions
            .iter()
            .filter(|d| d.decision == decision)
            .map(|d| &d.candidate)
            .collect()
    }

    pub fn decision_for(&self, id: &CandidateId) -> Option<&DecisionRecord> {
        self.decisions
            .binary_search_by(|d| d.candidate.cmp(id))
            .ok()
            .map(|i| &self.decisions[i])
    }

    pub fn failure_for(&self, id: &CandidateId) -> Option<&str> {
        self.failures
            .binary_search_by(|f| f.candidate.cmp(id))
            .ok()
            .map(|i| self.failures[i].error.as_str())
    }

    /// Share of the universe retained; an empty universe counts as fully retained.
    pub fn retained_ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.retained().len() as f64 / self.total as f64
    }
}
