//! Candidate model: one tag on one artifact, the unit of retention.

use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use registry_state::Artifact;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetentionError};

/// Identity of a candidate: (repository, tag, digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId {
    pub repository: String,
    pub tag: String,
    pub digest: String,
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.repository, self.tag, self.digest)
    }
}

/// A tagged artifact under evaluation.
///
/// Equality and hashing use the identity triple only; metadata such as
/// timestamps and labels do not participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub namespace_id: i64,
    pub repository: String,
    pub tag: String,
    /// Artifact type, e.g. `image` or `chart`.
    pub kind: String,
    pub digest: String,
    pub pushed_time: DateTime<Utc>,
    #[serde(default)]
    pub pulled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: BTreeSet<i64>,
}

impl Candidate {
    pub fn id(&self) -> CandidateId {
        CandidateId {
            repository: self.repository.clone(),
            tag: self.tag.clone(),
            digest: self.digest.clone(),
        }
    }

    /// Most recent of push and pull time.
    pub fn last_activity(&self) -> DateTime<Utc> {
        match self.pulled_time {
            Some(pulled) if pulled > self.pushed_time => pulled,
            _ => self.pushed_time,
        }
    }

    fn identity(&self) -> (&str, &str, &str) {
        (&self.repository, &self.tag, &self.digest)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Immutable snapshot of the candidate universe for one run.
///
/// Candidates are stored in identity order, so everything derived from the
/// snapshot is independent of the order the provider returned them in.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    index: HashMap<CandidateId, usize>,
}

impl CandidateSet {
    /// Build a snapshot, rejecting duplicate (repository, tag) pairs.
    pub fn new(mut candidates: Vec<Candidate>) -> Result<Self> {
        candidates.sort_by(|a, b| a.identity().cmp(&b.identity()));

        for pair in candidates.windows(2) {
            if pair[0].repository == pair[1].repository && pair[0].tag == pair[1].tag {
                return Err(RetentionError::DuplicateCandidate {
                    repository: pair[0].repository.clone(),
                    tag: pair[0].tag.clone(),
                });
            }
        }

        let index = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id(), i))
            .collect();
        Ok(Self {
            items: candidates,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }

    /// Borrowed view of every candidate, in identity order.
    pub fn refs(&self) -> Vec<&Candidate> {
        self.items.iter().collect()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.index.contains_key(id)
    }
}

/// Expand filtered artifacts into candidates, one per tag.
///
/// Tag push/pull times are used, since retention decides per tag.
pub fn candidates_from_artifacts(artifacts: &[Artifact]) -> Vec<Candidate> {
    artifacts
        .iter()
        .flat_map(|artifact| {
            let labels: BTreeSet<i64> = artifact.labels.iter().map(|l| l.id).collect();
            artifact.tags.iter().map(move |tag| Candidate {
                namespace_id: artifact.project_id,
                repository: artifact.repository_name.clone(),
                tag: tag.name.clone(),
                kind: artifact.kind.clone(),
                digest: artifact.digest.clone(),
                pushed_time: tag.push_time,
                pulled_time: tag.pull_time,
                labels: labels.clone(),
            })
        })
        .collect()
}
