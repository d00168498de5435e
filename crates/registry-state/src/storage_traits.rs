//! Collaborator trait definitions for the retention engine
//!
//! These traits define the registry-side abstractions the engine consumes:
//! - `UserDirectory`: resolves a username to identity, admin flag and groups
//! - `ProjectCatalog`: lists projects, optionally constrained by membership
//! - `RepositoryCatalog`: lists repositories under a set of projects
//! - `ArtifactCatalog`: lists tagged artifacts of one repository
//! - `TagStore`: removes one tag from one repository
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::{Artifact, Project, ProjectQuery, Repository, User};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Identity lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by name. Returns `StorageError::NotFound` if absent.
    async fn get_by_name(&self, username: &str) -> StorageResult<User>;
}

/// Project listing.
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    /// List projects admitted by `query`, ordered by project ID.
    async fn list_projects(&self, query: &ProjectQuery) -> StorageResult<Vec<Project>>;
}

/// Repository listing.
#[async_trait]
pub trait RepositoryCatalog: Send + Sync {
    /// List repositories owned by any of `project_ids`, ordered by repository ID.
    async fn list_repositories(&self, project_ids: &[i64]) -> StorageResult<Vec<Repository>>;
}

/// Artifact listing.
#[async_trait]
pub trait ArtifactCatalog: Send + Sync {
    /// List artifacts of one repository with their tags and labels attached.
    async fn list_artifacts(&self, repository_id: i64) -> StorageResult<Vec<Artifact>>;
}

/// The mutating side: tag removal.
///
/// Guarantees:
/// - `remove_tag` affects exactly the named (repository, tag) pair.
/// - `digest` identifies the artifact the caller expects the tag to point at;
///   implementations must refuse to remove a tag that has since moved.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn remove_tag(&self, repository: &str, tag: &str, digest: &str) -> StorageResult<()>;
}
