//! Unconditional templates.

use crate::candidate::Candidate;
use crate::error::ParameterError;

use super::{Evaluator, Parameters, TemplateContext, TemplateRegistry};

pub const ALWAYS: &str = "always";
pub const NOTHING: &str = "nothing";

/// Retains every candidate it is given.
#[derive(Debug, Clone, Copy)]
pub struct Always;

impl Evaluator for Always {
    fn template(&self) -> &str {
        ALWAYS
    }

    fn evaluate<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        candidates.to_vec()
    }
}

/// Retains nothing.
#[derive(Debug, Clone, Copy)]
pub struct Nothing;

impl Evaluator for Nothing {
    fn template(&self) -> &str {
        NOTHING
    }

    fn evaluate<'a>(&self, _candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        Vec::new()
    }
}

fn always(_: &Parameters, _: &TemplateContext) -> Result<Box<dyn Evaluator>, ParameterError> {
    Ok(Box::new(Always))
}

fn nothing(_: &Parameters, _: &TemplateContext) -> Result<Box<dyn Evaluator>, ParameterError> {
    Ok(Box::new(Nothing))
}

pub fn register(registry: &mut TemplateRegistry) {
    registry.register(ALWAYS, always);
    registry.register(NOTHING, nothing);
}
