//! Resolves a policy document into a runnable [`Processor`].
//!
//! Every name in the policy is resolved and every parameter bound before a
//! processor exists, so configuration errors surface before any candidate
//! is evaluated or removed.

use std::sync::Arc;

use crate::action::ActionContext;
use crate::alg::{AlgorithmContext, Parameter, Processor};
use crate::candidate::CandidateSet;
use crate::engine::EngineContext;
use crate::error::{Result, RetentionError};
use crate::obs;
use crate::policy::{PolicyMetadata, Rule, SelectorSpec};
use crate::selector::Selector;

pub struct Builder<'a> {
    ctx: &'a EngineContext,
    universe: Arc<CandidateSet>,
}

impl<'a> Builder<'a> {
    /// `universe` is the full candidate set every performer of the built
    /// processor is constructed with.
    pub fn new(ctx: &'a EngineContext, universe: Arc<CandidateSet>) -> Self {
        Self { ctx, universe }
    }

    pub fn build(&self, policy: &PolicyMetadata, dry_run: bool) -> Result<Box<dyn Processor>> {
        policy.validate(self.ctx.config.max_rules)?;
        if !dry_run && self.ctx.store.is_none() {
            return Err(RetentionError::MissingTagStore);
        }

        let action_ctx = ActionContext {
            universe: Arc::clone(&self.universe),
            store: self.ctx.store.clone(),
            dry_run,
            max_concurrent: self.ctx.config.max_concurrent_removals,
        };

        let mut params = Vec::with_capacity(policy.rules.len());
        for (rule_index, rule) in policy.rules.iter().enumerate() {
            if rule.disabled {
                continue;
            }
            params.push(self.resolve_rule(rule_index, rule, &action_ctx)?);
        }

        let factory = self.ctx.algorithms.get(&policy.algorithm).ok_or_else(|| {
            RetentionError::UnknownAlgorithm {
                name: policy.algorithm.clone(),
            }
        })?;

        let resolved = params.len();
        let processor = factory(
            params,
            &AlgorithmContext {
                universe: Arc::clone(&self.universe),
                dry_run,
            },
        );
        obs::emit_build_finished(
            &policy.algorithm,
            resolved,
            policy.rules.len() - resolved,
            dry_run,
        );
        Ok(processor)
    }

    fn resolve_rule(
        &self,
        rule_index: usize,
        rule: &Rule,
        action_ctx: &ActionContext,
    ) -> Result<Parameter> {
        let template = self.ctx.templates.get(&rule.template).ok_or_else(|| {
            RetentionError::UnknownTemplate {
                rule_index,
                name: rule.template.clone(),
            }
        })?;
        let evaluator = template(&rule.params, &self.ctx.template_context())
            .map_err(|source| RetentionError::InvalidRule { rule_index, source })?;

        let scope_selectors = self.resolve_selectors(rule_index, &rule.scope_selectors)?;
        let selectors = self.resolve_selectors(rule_index, &rule.tag_selectors)?;

        let action = self.ctx.actions.get(&rule.action).ok_or_else(|| {
            RetentionError::UnknownAction {
                rule_index,
                action: rule.action.clone(),
            }
        })?;

        Ok(Parameter {
            rule_index,
            evaluator,
            scope_selectors,
            selectors,
            performer: action(action_ctx),
        })
    }

    fn resolve_selectors(
        &self,
        rule_index: usize,
        specs: &[SelectorSpec],
    ) -> Result<Vec<Box<dyn Selector>>> {
        specs
            .iter()
            .map(|spec| {
                let factory = self.ctx.selectors.get(&spec.kind).ok_or_else(|| {
                    RetentionError::UnknownSelectorKind {
                        rule_index,
                        kind: spec.kind.clone(),
                    }
                })?;
                factory(spec.decoration, &spec.pattern, spec.extras.as_ref())
                    .map_err(|source| RetentionError::InvalidRule { rule_index, source })
            })
            .collect()
    }
}
