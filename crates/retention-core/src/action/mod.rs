//! Performers: apply (or simulate) removal of non-retained candidates.
//!
//! A performer is resolved from a rule's action name and the run's dry-run
//! flag. Real and dry-run performers are built from the same candidate
//! universe and receive the same removal set; only side effects differ.

pub mod retain;

use std::sync::Arc;

use async_trait::async_trait;
use registry_state::TagStore;
use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, CandidateId, CandidateSet};
use crate::error::Result;
use crate::registry::Registry;

pub use retain::{DryRunPerformer, RetainPerformer};

/// What happened to one candidate handed to a performer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    Removed,
    WouldRemove,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub candidate: CandidateId,
    #[serde(flatten)]
    pub status: ActionStatus,
}

#[async_trait]
pub trait Performer: Send + Sync + std::fmt::Debug {
    /// Registered action name.
    fn action(&self) -> &str;

    fn is_dry_run(&self) -> bool;

    /// The candidate universe this performer was constructed with.
    fn universe(&self) -> &CandidateSet;

    /// Act on every candidate in `removals`, one outcome per candidate in
    /// input order.
    ///
    /// Per-candidate failures are reported as [`ActionStatus::Failed`];
    /// only cancellation aborts with an error.
    async fn perform(&self, removals: &[&Candidate]) -> Result<Vec<ActionOutcome>>;
}

/// Inputs shared by every performer of one run.
#[derive(Clone)]
pub struct ActionContext {
    pub universe: Arc<CandidateSet>,
    /// Required unless `dry_run` is set.
    pub store: Option<Arc<dyn TagStore>>,
    pub dry_run: bool,
    pub max_concurrent: usize,
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("universe", &self.universe.len())
            .field("store", &self.store.is_some())
            .field("dry_run", &self.dry_run)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

pub type ActionFactory = fn(&ActionContext) -> Box<dyn Performer>;

pub type ActionRegistry = Registry<ActionFactory>;

impl Registry<ActionFactory> {
    /// Registry holding the built-in actions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        retain::register(&mut registry);
        registry
    }
}
