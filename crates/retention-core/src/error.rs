//! Error taxonomy for the retention engine.

use registry_state::StorageError;

use crate::candidate::CandidateId;

/// Errors produced by template and selector factories when a rule's
/// parameters cannot be bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("missing parameter '{key}'")]
    Missing { key: String },

    #[error("invalid parameter '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },
}

/// Retention engine errors.
#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("policy does not name a combination algorithm")]
    MissingAlgorithm,

    #[error("unknown algorithm '{name}'")]
    UnknownAlgorithm { name: String },

    #[error("rule {rule_index}: unknown template '{name}'")]
    UnknownTemplate { rule_index: usize, name: String },

    #[error("rule {rule_index}: unknown selector kind '{kind}'")]
    UnknownSelectorKind { rule_index: usize, kind: String },

    #[error("rule {rule_index}: unknown action '{action}'")]
    UnknownAction { rule_index: usize, action: String },

    #[error("rule {rule_index}: {source}")]
    InvalidRule {
        rule_index: usize,
        source: ParameterError,
    },

    #[error("duplicate candidate {repository}:{tag} in candidate universe")]
    DuplicateCandidate { repository: String, tag: String },

    #[error("rule {rule_index} ({template}) retained {candidate}, which was not in its input")]
    EvaluationInconsistency {
        rule_index: usize,
        template: String,
        candidate: CandidateId,
    },

    #[error("processor was built over {expected} candidates but was given a different set of {actual}")]
    UniverseMismatch { expected: usize, actual: usize },

    #[error("a real run needs a tag store; none is configured")]
    MissingTagStore,

    #[error("invalid filter: {0}")]
    InvalidFilter(#[source] ParameterError),

    #[error("collaborator error: {0}")]
    Collaborator(StorageError),

    #[error("run cancelled")]
    Cancelled,
}

impl From<StorageError> for RetentionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => RetentionError::Cancelled,
            other => RetentionError::Collaborator(other),
        }
    }
}

impl RetentionError {
    /// Whether this error was raised while building, before any candidate
    /// was evaluated.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RetentionError::InvalidPolicy(_)
                | RetentionError::MissingAlgorithm
                | RetentionError::UnknownAlgorithm { .. }
                | RetentionError::UnknownTemplate { .. }
                | RetentionError::UnknownSelectorKind { .. }
                | RetentionError::UnknownAction { .. }
                | RetentionError::InvalidRule { .. }
                | RetentionError::MissingTagStore
        )
    }
}

/// Result type for retention operations.
pub type Result<T> = std::result::Result<T, RetentionError>;
