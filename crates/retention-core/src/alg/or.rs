//! The `or` algorithm.
//!
//! A rule touches the candidates that pass its scope selectors. A candidate
//! is removed when at least one rule touches it and no rule retains it;
//! candidates no rule touches are always retained. Removals go to the
//! performer of the first rule (in declaration order) that touched them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::ActionStatus;
use crate::candidate::{Candidate, CandidateSet};
use crate::error::{Result, RetentionError};
use crate::obs;
use crate::report::{Decision, DecisionRecord, RemovalFailure, RunReport};
use crate::selector::apply_all;

use super::{AlgorithmContext, AlgorithmRegistry, Parameter, Processor};

pub const OR: &str = "or";

#[derive(Debug)]
pub struct OrProcessor {
    params: Vec<Parameter>,
    universe: Arc<CandidateSet>,
    dry_run: bool,
}

impl OrProcessor {
    /// `universe` must be the set the parameters' performers were bound to.
    pub fn new(params: Vec<Parameter>, universe: Arc<CandidateSet>, dry_run: bool) -> Self {
        Self {
            params,
            universe,
            dry_run,
        }
    }

    fn check_universe(&self, candidates: &CandidateSet) -> Result<()> {
        let bound = &*self.universe;
        if std::ptr::eq(bound, candidates) {
            return Ok(());
        }
        // Candidates compare by identity; both sets are in identity order.
        if bound.len() == candidates.len() && bound.iter().eq(candidates.iter()) {
            Ok(())
        } else {
            Err(RetentionError::UniverseMismatch {
                expected: bound.len(),
                actual: candidates.len(),
            })
        }
    }
}

#[async_trait]
impl Processor for OrProcessor {
    fn algorithm(&self) -> &str {
        OR
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn process(&self, candidates: &CandidateSet) -> Result<RunReport> {
        self.check_universe(candidates)?;
        let universe = self.universe.refs();

        // Rule index that retained each candidate first, and position of the
        // first parameter whose scope covered it.
        let mut retained_by: HashMap<&Candidate, usize> = HashMap::new();
        let mut touched_by: HashMap<&Candidate, usize> = HashMap::new();

        for (position, param) in self.params.iter().enumerate() {
            let in_scope = apply_all(&param.scope_selectors, universe.clone());
            for c in &in_scope {
                touched_by.entry(*c).or_insert(position);
            }

            let selected = apply_all(&param.selectors, in_scope.clone());
            let retained = param.evaluator.evaluate(&selected);

            let admitted: HashSet<&Candidate> = selected.iter().copied().collect();
            if let Some(stray) = retained.iter().find(|c| !admitted.contains(*c)) {
                return Err(RetentionError::EvaluationInconsistency {
                    rule_index: param.rule_index,
                    template: param.evaluator.template().to_string(),
                    candidate: stray.id(),
                });
            }

            obs::emit_rule_evaluated(
                param.rule_index,
                param.evaluator.template(),
                in_scope.len(),
                selected.len(),
                retained.len(),
            );
            for c in retained {
                retained_by.entry(c).or_insert(param.rule_index);
            }
        }

        let mut removals: Vec<Vec<&Candidate>> = vec![Vec::new(); self.params.len()];
        for c in &universe {
            if retained_by.contains_key(c) {
                continue;
            }
            if let Some(&position) = touched_by.get(c) {
                removals[position].push(*c);
            }
        }

        let mut outcomes = HashMap::new();
        for (param, group) in self.params.iter().zip(&removals) {
            if group.is_empty() {
                continue;
            }
            for outcome in param.performer.perform(group).await? {
                outcomes.insert(outcome.candidate, outcome.status);
            }
        }

        let mut decisions = Vec::with_capacity(universe.len());
        let mut failures = Vec::new();
        for c in &universe {
            let id = c.id();
            let record = if let Some(&rule_index) = retained_by.get(c) {
                DecisionRecord {
                    candidate: id,
                    decision: Decision::Retained,
                    rule_index: Some(rule_index),
                    outcome: None,
                }
            } else if let Some(&position) = touched_by.get(c) {
                let outcome = outcomes.remove(&id);
                if let Some(ActionStatus::Failed { error }) = &outcome {
                    failures.push(RemovalFailure {
                        candidate: id.clone(),
                        error: error.clone(),
                    });
                }
                DecisionRecord {
                    candidate: id,
                    decision: Decision::Removed,
                    rule_index: Some(self.params[position].rule_index),
                    outcome,
                }
            } else {
                DecisionRecord {
                    candidate: id,
                    decision: Decision::Retained,
                    rule_index: None,
                    outcome: None,
                }
            };
            decisions.push(record);
        }

        let report = RunReport {
            dry_run: self.dry_run,
            total: universe.len(),
            decisions,
            failures,
        };
        obs::emit_run_finished(
            report.total,
            report.retained().len(),
            report.removed().len(),
            report.failures.len(),
            self.dry_run,
        );
        Ok(report)
    }
}

fn or(params: Vec<Parameter>, ctx: &AlgorithmContext) -> Box<dyn Processor> {
    Box::new(OrProcessor::new(
        params,
        Arc::clone(&ctx.universe),
        ctx.dry_run,
    ))
}

pub fn register(registry: &mut AlgorithmRegistry) {
    registry.register(OR, or);
}
