//! Retention Core Library
//!
//! Decides which tags of a container-image registry project to keep and
//! which to remove. A policy's rules are resolved against pluggable
//! registries (selector kinds, templates, actions, algorithms) into a
//! [`Processor`], which evaluates a fixed candidate snapshot and hands the
//! removal set to each rule's performer.

pub mod action;
pub mod alg;
pub mod builder;
pub mod candidate;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod obs;
pub mod pattern;
pub mod policy;
pub mod registry;
pub mod report;
pub mod rule;
pub mod selector;
pub mod telemetry;

pub use action::{
    ActionContext, ActionOutcome, ActionRegistry, ActionStatus, DryRunPerformer, Performer,
    RetainPerformer,
};
pub use alg::{AlgorithmContext, AlgorithmRegistry, OrProcessor, Parameter, Processor};
pub use builder::Builder;
pub use candidate::{candidates_from_artifacts, Candidate, CandidateId, CandidateSet};
pub use config::EngineConfig;
pub use engine::EngineContext;
pub use error::{ParameterError, Result, RetentionError};
pub use filter::{DefaultFilterProcessor, FilterProcessor};
pub use pattern::GlobPattern;
pub use policy::{Decoration, PolicyMetadata, Rule, Scope, SelectorSpec};
pub use registry::Registry;
pub use report::{Decision, DecisionRecord, RemovalFailure, RunReport};
pub use rule::{Evaluator, Parameters, TemplateContext, TemplateRegistry};
pub use selector::{Selector, SelectorRegistry};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
