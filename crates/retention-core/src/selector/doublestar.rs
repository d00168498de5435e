//! Pattern selectors over tag names and repository names.

use serde_json::Value;

use crate::candidate::Candidate;
use crate::error::ParameterError;
use crate::pattern::GlobPattern;
use crate::policy::Decoration;

use super::{Selector, SelectorRegistry};

/// Tag-name pattern kind.
pub const KIND_TAG: &str = "doublestar";
/// Repository-name pattern kind.
pub const KIND_REPOSITORY: &str = "repository";

/// Which candidate attribute a pattern selector reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTarget {
    Tag,
    Repository,
}

#[derive(Debug, Clone)]
pub struct PatternSelector {
    target: PatternTarget,
    decoration: Decoration,
    pattern: GlobPattern,
}

impl PatternSelector {
    pub fn new(
        target: PatternTarget,
        decoration: Decoration,
        pattern: &str,
    ) -> Result<Self, ParameterError> {
        Ok(Self {
            target,
            decoration,
            pattern: GlobPattern::compile(pattern)?,
        })
    }

    fn matches(&self, candidate: &Candidate) -> bool {
        match self.target {
            PatternTarget::Tag => self.pattern.is_match(&candidate.tag),
            PatternTarget::Repository => self.pattern.matches_repository(&candidate.repository),
        }
    }
}

impl Selector for PatternSelector {
    fn kind(&self) -> &str {
        match self.target {
            PatternTarget::Tag => KIND_TAG,
            PatternTarget::Repository => KIND_REPOSITORY,
        }
    }

    fn select<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        let out: Vec<&'a Candidate> = candidates
            .iter()
            .copied()
            .filter(|c| self.decoration.keeps(self.matches(c)))
            .collect();
        tracing::trace!(
            kind = self.kind(),
            pattern = self.pattern.as_str(),
            input = candidates.len(),
            output = out.len(),
            "pattern selector applied"
        );
        out
    }
}

fn tag_factory(
    decoration: Decoration,
    pattern: &str,
    _extras: Option<&Value>,
) -> Result<Box<dyn Selector>, ParameterError> {
    Ok(Box::new(PatternSelector::new(
        PatternTarget::Tag,
        decoration,
        pattern,
    )?))
}

fn repository_factory(
    decoration: Decoration,
    pattern: &str,
    _extras: Option<&Value>,
) -> Result<Box<dyn Selector>, ParameterError> {
    Ok(Box::new(PatternSelector::new(
        PatternTarget::Repository,
        decoration,
        pattern,
    )?))
}

pub fn register(registry: &mut SelectorRegistry) {
    registry.register(KIND_TAG, tag_factory);
    registry.register(KIND_REPOSITORY, repository_factory);
}
