//! Registry records exchanged with the retention engine.
//!
//! These mirror what a registry's metadata store hands out: users with group
//! memberships, projects (namespaces), repositories, artifacts and the tags
//! and labels attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registry account as resolved by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    /// System administrators see every project.
    #[serde(default)]
    pub sys_admin: bool,
    /// Groups the user belongs to; project membership may come through these.
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

/// A project (namespace) that owns repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub name: String,
    /// Users that are direct members.
    #[serde(default)]
    pub member_user_ids: Vec<i64>,
    /// Groups whose members are project members.
    #[serde(default)]
    pub member_group_ids: Vec<i64>,
}

impl Project {
    /// Whether the query's member constraint admits this project.
    pub fn has_member(&self, member: &MemberQuery) -> bool {
        self.member_user_ids.contains(&member.user_id)
            || member
                .group_ids
                .iter()
                .any(|g| self.member_group_ids.contains(g))
    }
}

/// Membership constraint for project listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberQuery {
    pub user_id: i64,
    pub group_ids: Vec<i64>,
}

/// Project listing query. `member: None` lists every project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectQuery {
    pub member: Option<MemberQuery>,
}

impl ProjectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_member(user_id: i64, group_ids: Vec<i64>) -> Self {
        Self {
            member: Some(MemberQuery { user_id, group_ids }),
        }
    }
}

/// A repository; `name` is the full name including the project prefix
/// (e.g. `library/app` or `library/base/ubuntu`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repository_id: i64,
    pub project_id: i64,
    pub name: String,
}

impl Repository {
    /// Path below the project namespace (`library/base/ubuntu` → `base/ubuntu`).
    ///
    /// Single-segment names have no project prefix and are returned as is.
    pub fn relative_name(&self) -> &str {
        self.name
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.name)
    }
}

/// A label attached to an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A tag pointing at an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub push_time: DateTime<Utc>,
    #[serde(default)]
    pub pull_time: Option<DateTime<Utc>>,
}

/// An artifact together with its tags and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub project_id: i64,
    pub repository_id: i64,
    pub repository_name: String,
    pub digest: String,
    /// Artifact type, e.g. `image` or `chart`.
    pub kind: String,
    pub push_time: DateTime<Utc>,
    #[serde(default)]
    pub pull_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Artifact {
    /// Whether any attached label is in `label_ids`.
    pub fn has_any_label(&self, label_ids: &[i64]) -> bool {
        self.labels.iter().any(|l| label_ids.contains(&l.id))
    }

    /// A copy of this artifact carrying only `tag`.
    pub fn with_single_tag(&self, tag: &Tag) -> Self {
        Self {
            tags: vec![tag.clone()],
            ..self.clone()
        }
    }
}
