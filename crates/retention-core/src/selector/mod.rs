//! Selectors: pure narrowing steps over a candidate set.
//!
//! A selector never invents or duplicates candidates: its output is an
//! order-preserving subsequence of its input. For a fixed pattern, the
//! `matches` and `excludes` decorations partition the input.
//!
//! # Modules
//!
//! - [`doublestar`]: `doublestar` (tag name) and `repository` pattern kinds
//! - [`label`]: `label` kind over label-ID sets

pub mod doublestar;
pub mod label;

use serde_json::Value;

use crate::candidate::Candidate;
use crate::error::ParameterError;
use crate::policy::Decoration;
use crate::registry::Registry;

pub use doublestar::{PatternSelector, PatternTarget};
pub use label::LabelSelector;

/// A bound selector.
pub trait Selector: Send + Sync + std::fmt::Debug {
    /// Registered kind name.
    fn kind(&self) -> &str;

    /// Keep the subset of `candidates` this selector admits, in input order.
    fn select<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate>;
}

/// Constructs a selector from its decoration, pattern and kind-specific extras.
pub type SelectorFactory =
    fn(Decoration, &str, Option<&Value>) -> Result<Box<dyn Selector>, ParameterError>;

pub type SelectorRegistry = Registry<SelectorFactory>;

impl Registry<SelectorFactory> {
    /// Registry holding the built-in selector kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        doublestar::register(&mut registry);
        label::register(&mut registry);
        registry
    }
}

/// Run `selectors` in sequence; each narrows the previous output.
pub fn apply_all<'a>(
    selectors: &[Box<dyn Selector>],
    candidates: Vec<&'a Candidate>,
) -> Vec<&'a Candidate> {
    selectors
        .iter()
        .fold(candidates, |narrowed, s| s.select(&narrowed))
}
