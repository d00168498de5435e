//! Registry-State: collaborator contracts for the tag retention engine
//!
//! This crate defines the boundary between the retention engine and the
//! registry it governs. The engine never talks to a database or network
//! directly; it calls the traits defined here.
//!
//! ## Key Components
//!
//! - `model`: users, projects, repositories, artifacts, tags, labels
//! - `storage_traits`: async lookup, listing and removal contracts
//! - `fakes`: `MemoryRegistry`, an in-memory implementation for tests

mod error;
pub mod fakes;
pub mod model;
pub mod storage_traits;

pub use error::StorageError;
pub use model::{Artifact, Label, MemberQuery, Project, ProjectQuery, Repository, Tag, User};
pub use storage_traits::{
    ArtifactCatalog, ProjectCatalog, RepositoryCatalog, StorageResult, TagStore, UserDirectory,
};
