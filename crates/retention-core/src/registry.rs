//! Name → factory registries for the pluggable roles.
//!
//! Each plugin role (selector kind, template, action, algorithm) has its own
//! factory signature; a `Registry` maps names to factories of one signature.
//! Plugins add themselves through a `register` function in their module, and
//! `with_defaults` on each role's registry calls those.

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Registry<F> {
    factories: BTreeMap<String, F>,
}

impl<F> Default for Registry<F> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<F: Copy> Registry<F> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, factory: F) -> &mut Self {
        if self.factories.insert(name.to_string(), factory).is_some() {
            tracing::debug!(name, "registry entry replaced");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<F> {
        self.factories.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
