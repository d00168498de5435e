//! Narrowing a project's artifact universe before any rule runs.
//!
//! Each stage calls out to one registry collaborator. A collaborator error
//! aborts the stage with no partial result; a cancellation reported by any
//! collaborator surfaces as [`RetentionError::Cancelled`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use registry_state::{
    Artifact, ArtifactCatalog, ProjectCatalog, ProjectQuery, RepositoryCatalog, UserDirectory,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Result, RetentionError};
use crate::pattern::GlobPattern;

#[async_trait]
pub trait FilterProcessor: Send + Sync {
    /// Project IDs visible to `username`, intersected with `project_ids`
    /// when that list is non-empty.
    ///
    /// System admins see every project; other users see the projects they
    /// belong to directly or through one of their groups.
    async fn process_project_filter(
        &self,
        username: &str,
        project_ids: &[i64],
    ) -> Result<Vec<i64>>;

    /// IDs of repositories under `project_ids` whose name matches `pattern`.
    async fn process_repository_filter(
        &self,
        pattern: &str,
        project_ids: &[i64],
    ) -> Result<Vec<i64>>;

    /// Tag instances under `repository_ids` whose tag name matches `pattern`.
    ///
    /// Each returned artifact carries exactly one tag.
    async fn process_tag_filter(
        &self,
        pattern: &str,
        repository_ids: &[i64],
    ) -> Result<Vec<Artifact>>;

    /// Artifacts carrying at least one of `label_ids`. An empty filter
    /// returns `artifacts` unchanged.
    fn process_label_filter(&self, label_ids: &[i64], artifacts: Vec<Artifact>) -> Vec<Artifact>;
}

/// [`FilterProcessor`] over the registry collaborator traits.
#[derive(Clone)]
pub struct DefaultFilterProcessor {
    users: Arc<dyn UserDirectory>,
    projects: Arc<dyn ProjectCatalog>,
    repositories: Arc<dyn RepositoryCatalog>,
    artifacts: Arc<dyn ArtifactCatalog>,
    max_concurrent_listings: usize,
}

impl DefaultFilterProcessor {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        projects: Arc<dyn ProjectCatalog>,
        repositories: Arc<dyn RepositoryCatalog>,
        artifacts: Arc<dyn ArtifactCatalog>,
    ) -> Self {
        Self {
            users,
            projects,
            repositories,
            artifacts,
            max_concurrent_listings: EngineConfig::default().max_concurrent_listings,
        }
    }

    /// All four collaborators served by one backend.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserDirectory + ProjectCatalog + RepositoryCatalog + ArtifactCatalog + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    /// Bound on per-repository artifact listings in flight at once.
    pub fn with_listing_concurrency(mut self, max: usize) -> Self {
        self.max_concurrent_listings = max.max(1);
        self
    }

    /// Apply the listing bound from `config`.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_listing_concurrency(config.max_concurrent_listings)
    }
}

fn compile(pattern: &str) -> Result<GlobPattern> {
    GlobPattern::compile(pattern).map_err(RetentionError::InvalidFilter)
}

#[async_trait]
impl FilterProcessor for DefaultFilterProcessor {
    async fn process_project_filter(
        &self,
        username: &str,
        project_ids: &[i64],
    ) -> Result<Vec<i64>> {
        let user = self.users.get_by_name(username).await?;
        let query = if user.sys_admin {
            ProjectQuery::all()
        } else {
            ProjectQuery::for_member(user.user_id, user.group_ids.clone())
        };

        let visible = self.projects.list_projects(&query).await?;
        let ids: Vec<i64> = visible
            .iter()
            .map(|p| p.project_id)
            .filter(|id| project_ids.is_empty() || project_ids.contains(id))
            .collect();
        debug!(
            username,
            sys_admin = user.sys_admin,
            visible = visible.len(),
            kept = ids.len(),
            "project filter"
        );
        Ok(ids)
    }

    async fn process_repository_filter(
        &self,
        pattern: &str,
        project_ids: &[i64],
    ) -> Result<Vec<i64>> {
        let pattern = compile(pattern)?;
        let repositories = self.repositories.list_repositories(project_ids).await?;
        Ok(repositories
            .iter()
            .filter(|r| pattern.matches_repository(&r.name))
            .map(|r| r.repository_id)
            .collect())
    }

    async fn process_tag_filter(
        &self,
        pattern: &str,
        repository_ids: &[i64],
    ) -> Result<Vec<Artifact>> {
        let pattern = compile(pattern)?;
        let catalog = &self.artifacts;
        // Built eagerly so the boxed future stays `Send`.
        let pending: Vec<_> = repository_ids
            .iter()
            .copied()
            .map(|id| async move { catalog.list_artifacts(id).await })
            .collect();
        let listings: Vec<Vec<Artifact>> = stream::iter(pending)
            .buffered(self.max_concurrent_listings)
            .try_collect()
            .await?;

        let pattern = &pattern;
        Ok(listings
            .iter()
            .flatten()
            .flat_map(move |artifact| {
                artifact
                    .tags
                    .iter()
                    .filter(move |tag| pattern.is_match(&tag.name))
                    .map(move |tag| artifact.with_single_tag(tag))
            })
            .collect())
    }

    fn process_label_filter(&self, label_ids: &[i64], artifacts: Vec<Artifact>) -> Vec<Artifact> {
        if label_ids.is_empty() {
            return artifacts;
        }
        artifacts
            .into_iter()
            .filter(|a| a.has_any_label(label_ids))
            .collect()
    }
}

impl std::fmt::Debug for DefaultFilterProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultFilterProcessor")
            .field("max_concurrent_listings", &self.max_concurrent_listings)
            .finish_non_exhaustive()
    }
}
