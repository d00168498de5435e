//! The engine context: registries, collaborators and run-wide settings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use registry_state::{
    ArtifactCatalog, ProjectCatalog, RepositoryCatalog, TagStore, UserDirectory,
};
use tracing::Instrument;

use crate::action::ActionRegistry;
use crate::alg::AlgorithmRegistry;
use crate::builder::Builder;
use crate::candidate::{Candidate, CandidateSet};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter::DefaultFilterProcessor;
use crate::obs;
use crate::policy::PolicyMetadata;
use crate::report::RunReport;
use crate::rule::{TemplateContext, TemplateRegistry};
use crate::selector::SelectorRegistry;

/// Everything a [`Builder`] resolves names against.
///
/// Registries are plain fields: populate them before building and leave
/// them alone afterwards.
pub struct EngineContext {
    pub templates: TemplateRegistry,
    pub selectors: SelectorRegistry,
    pub actions: ActionRegistry,
    pub algorithms: AlgorithmRegistry,
    /// Removal backend; only real runs need one.
    pub store: Option<Arc<dyn TagStore>>,
    pub config: EngineConfig,
    /// Evaluation instant shared by every age-based template of a run.
    pub now: DateTime<Utc>,
}

impl EngineContext {
    /// Built-in plugins, default config, no store, clock read once here.
    pub fn with_defaults() -> Self {
        Self {
            templates: TemplateRegistry::with_defaults(),
            selectors: SelectorRegistry::with_defaults(),
            actions: ActionRegistry::with_defaults(),
            algorithms: AlgorithmRegistry::with_defaults(),
            store: None,
            config: EngineConfig::default(),
            now: Utc::now(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn TagStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn template_context(&self) -> TemplateContext {
        TemplateContext { now: self.now }
    }

    /// Filter stages over `backend`, bounded by this engine's config.
    pub fn filter_processor<B>(&self, backend: Arc<B>) -> DefaultFilterProcessor
    where
        B: UserDirectory + ProjectCatalog + RepositoryCatalog + ArtifactCatalog + 'static,
    {
        DefaultFilterProcessor::from_backend(backend).with_config(&self.config)
    }

    pub fn builder(&self, universe: Arc<CandidateSet>) -> Builder<'_> {
        Builder::new(self, universe)
    }

    /// Snapshot `candidates`, build `policy` against them and process.
    pub async fn run(
        &self,
        policy: &PolicyMetadata,
        candidates: Vec<Candidate>,
        dry_run: bool,
    ) -> Result<RunReport> {
        let policy_id = policy.id.map(|id| id.to_string()).unwrap_or_default();
        async move {
            let universe = Arc::new(CandidateSet::new(candidates)?);
            let processor = self.builder(Arc::clone(&universe)).build(policy, dry_run)?;
            processor.process(&universe).await
        }
        .instrument(obs::run_span(&policy_id, dry_run))
        .await
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("templates", &self.templates.names())
            .field("selectors", &self.selectors.names())
            .field("actions", &self.actions.names())
            .field("algorithms", &self.algorithms.names())
            .field("store", &self.store.is_some())
            .field("config", &self.config)
            .field("now", &self.now)
            .finish()
    }
}
