//! Combination algorithms: turn per-rule retained sets into one run.
//!
//! # Modules
//!
//! - [`or`]: a candidate survives if any rule covering it retains it

pub mod or;

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Performer;
use crate::candidate::CandidateSet;
use crate::error::Result;
use crate::registry::Registry;
use crate::report::RunReport;
use crate::rule::Evaluator;
use crate::selector::Selector;

pub use or::OrProcessor;

/// One resolved rule, ready to run.
#[derive(Debug)]
pub struct Parameter {
    /// Declaration index of the rule in its policy.
    pub rule_index: usize,
    pub evaluator: Box<dyn Evaluator>,
    /// Decide which candidates the rule governs.
    pub scope_selectors: Vec<Box<dyn Selector>>,
    /// Narrow the governed candidates before evaluation.
    pub selectors: Vec<Box<dyn Selector>>,
    pub performer: Box<dyn Performer>,
}

/// A built retention run.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Registered algorithm name.
    fn algorithm(&self) -> &str;

    fn is_dry_run(&self) -> bool;

    /// Decide every candidate and hand removals to the rule performers.
    ///
    /// `candidates` must hold the same identities as the universe the
    /// processor was built over.
    async fn process(&self, candidates: &CandidateSet) -> Result<RunReport>;
}

/// Run-wide settings handed to an algorithm factory.
#[derive(Debug, Clone)]
pub struct AlgorithmContext {
    /// Candidate set the rule performers were bound to.
    pub universe: Arc<CandidateSet>,
    pub dry_run: bool,
}

pub type AlgorithmFactory = fn(Vec<Parameter>, &AlgorithmContext) -> Box<dyn Processor>;

pub type AlgorithmRegistry = Registry<AlgorithmFactory>;

impl Registry<AlgorithmFactory> {
    /// Registry holding the built-in algorithms.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        or::register(&mut registry);
        registry
    }
}
