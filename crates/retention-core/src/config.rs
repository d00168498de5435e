//! Engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Limits applied to every run of an engine.
///
/// Missing fields fall back to [`EngineConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Removals in flight at once per performer.
    pub max_concurrent_removals: usize,
    /// Per-repository artifact listings in flight at once while filtering.
    pub max_concurrent_listings: usize,
    /// Most rules a policy may declare.
    pub max_rules: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_removals: 8,
            max_concurrent_listings: 4,
            max_rules: 15,
        }
    }
}
