//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryRegistry`, which satisfies every trait contract in
//! `storage_traits` without external dependencies, records the calls made to
//! it and supports targeted failure injection.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::{Artifact, Project, ProjectQuery, Repository, User};
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct RegistryState {
    users: HashMap<String, User>,
    projects: Vec<Project>,
    repositories: Vec<Repository>,
    artifacts: Vec<Artifact>,
    project_queries: Vec<ProjectQuery>,
    removed: Vec<(String, String)>,
    failing_tags: BTreeSet<(String, String)>,
    fail_listings: bool,
    cancel_removals: bool,
}

/// In-memory registry backing all collaborator traits.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_user(&self, user: User) {
        self.state().users.insert(user.username.clone(), user);
    }

    pub fn add_project(&self, project: Project) {
        self.state().projects.push(project);
    }

    pub fn add_repository(&self, repository: Repository) {
        self.state().repositories.push(repository);
    }

    pub fn add_artifact(&self, artifact: Artifact) {
        self.state().artifacts.push(artifact);
    }

    /// Make every listing call fail with a backend error.
    pub fn fail_listings(&self, fail: bool) {
        self.state().fail_listings = fail;
    }

    /// Make removal of this (repository, tag) pair fail.
    pub fn fail_removal_of(&self, repository: &str, tag: &str) {
        self.state()
            .failing_tags
            .insert((repository.to_string(), tag.to_string()));
    }

    /// Make every removal report cancellation.
    pub fn cancel_removals(&self, cancel: bool) {
        self.state().cancel_removals = cancel;
    }

    /// Project queries received so far, in call order.
    pub fn project_queries(&self) -> Vec<ProjectQuery> {
        self.state().project_queries.clone()
    }

    /// (repository, tag) pairs removed so far, in call order.
    pub fn removed(&self) -> Vec<(String, String)> {
        self.state().removed.clone()
    }

    /// Remaining tag names of a repository, sorted.
    pub fn tags_of(&self, repository: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .state()
            .artifacts
            .iter()
            .filter(|a| a.repository_name == repository)
            .flat_map(|a| a.tags.iter().map(|t| t.name.clone()))
            .collect();
        tags.sort();
        tags
    }
}

#[async_trait]
impl UserDirectory for MemoryRegistry {
    async fn get_by_name(&self, username: &str) -> StorageResult<User> {
        self.state()
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                what: format!("user {username}"),
            })
    }
}

#[async_trait]
impl ProjectCatalog for MemoryRegistry {
    async fn list_projects(&self, query: &ProjectQuery) -> StorageResult<Vec<Project>> {
        let mut state = self.state();
        state.project_queries.push(query.clone());
        if state.fail_listings {
            return Err(StorageError::Backend("project listing failed".into()));
        }
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|p| query.member.as_ref().map_or(true, |m| p.has_member(m)))
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.project_id);
        Ok(projects)
    }
}

#[async_trait]
impl RepositoryCatalog for MemoryRegistry {
    async fn list_repositories(&self, project_ids: &[i64]) -> StorageResult<Vec<Repository>> {
        let state = self.state();
        if state.fail_listings {
            return Err(StorageError::Backend("repository listing failed".into()));
        }
        let mut repos: Vec<Repository> = state
            .repositories
            .iter()
            .filter(|r| project_ids.contains(&r.project_id))
            .cloned()
            .collect();
        repos.sort_by_key(|r| r.repository_id);
        Ok(repos)
    }
}

#[async_trait]
impl ArtifactCatalog for MemoryRegistry {
    async fn list_artifacts(&self, repository_id: i64) -> StorageResult<Vec<Artifact>> {
        let state = self.state();
        if state.fail_listings {
            return Err(StorageError::Backend("artifact listing failed".into()));
        }
        Ok(state
            .artifacts
            .iter()
            .filter(|a| a.repository_id == repository_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TagStore for MemoryRegistry {
    async fn remove_tag(&self, repository: &str, tag: &str, digest: &str) -> StorageResult<()> {
        let mut state = self.state();
        if state.cancel_removals {
            return Err(StorageError::Cancelled);
        }
        let key = (repository.to_string(), tag.to_string());
        if state.failing_tags.contains(&key) {
            return Err(StorageError::Backend(format!(
                "cannot remove {repository}:{tag}"
            )));
        }

        let artifact = state
            .artifacts
            .iter_mut()
            .find(|a| {
                a.repository_name == repository
                    && a.digest == digest
                    && a.tags.iter().any(|t| t.name == tag)
            })
            .ok_or_else(|| StorageError::NotFound {
                what: format!("tag {repository}:{tag}@{digest}"),
            })?;
        artifact.tags.retain(|t| t.name != tag);
        state.removed.push(key);
        tracing::trace!(repository, tag, "fake tag removed");
        Ok(())
    }
}
