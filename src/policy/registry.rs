// src/policy/registry.rs
//! Policy registration table
//!
//! Maps variant names to constructors. Populated once at process startup;
//! registration is order-independent and adding a variant never touches
//! the dispatch path.

use crate::agent::AgentConfig;
use crate::policy::{BehaviorPolicy, GeneratorPolicy, RandomPolicy, TopicalPolicy};
use crate::utils::errors::{FleetError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Constructor for one policy variant
pub type PolicyConstructor = fn(&AgentConfig) -> Box<dyn BehaviorPolicy>;

/// Name -> constructor table for behavior policy variants
pub struct PolicyRegistry {
    constructors: HashMap<String, PolicyConstructor>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Create a registry with all built-in variants registered.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("random", |config| Box::new(RandomPolicy::new(config)));
        registry.register("topical", |config| Box::new(TopicalPolicy::new(config)));
        registry.register("generator", |config| Box::new(GeneratorPolicy::new(config)));
        registry
    }

    /// Register a variant. Names are case-insensitive; a later
    /// registration under the same name replaces the earlier one.
    pub fn register(&mut self, name: &str, constructor: PolicyConstructor) {
        debug!(variant = name, "registered policy variant");
        self.constructors.insert(name.to_lowercase(), constructor);
    }

    /// Instantiate the named variant for the given agent config.
    pub fn create(&self, name: &str, config: &AgentConfig) -> Result<Box<dyn BehaviorPolicy>> {
        self.constructors
            .get(&name.to_lowercase())
            .map(|constructor| constructor(config))
            .ok_or_else(|| FleetError::Config(format!("unknown agent type '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_lowercase())
    }

    /// Registered variant names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_variants() {
        let registry = PolicyRegistry::builtin();
        assert_eq!(registry.names(), vec!["generator", "random", "topical"]);
    }

    #[test]
    fn test_create_is_case_insensitive() {
        let registry = PolicyRegistry::builtin();
        let policy = registry.create("Random", &AgentConfig::default()).unwrap();
        assert_eq!(policy.name(), "random");
    }

    #[test]
    fn test_unknown_variant_is_config_error() {
        let registry = PolicyRegistry::builtin();
        let err = registry
            .create("quantum", &AgentConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn test_registration_is_order_independent() {
        let mut a = PolicyRegistry::new();
        a.register("random", |c| Box::new(RandomPolicy::new(c)));
        a.register("topical", |c| Box::new(TopicalPolicy::new(c)));

        let mut b = PolicyRegistry::new();
        b.register("topical", |c| Box::new(TopicalPolicy::new(c)));
        b.register("random", |c| Box::new(RandomPolicy::new(c)));

        assert_eq!(a.names(), b.names());
    }
}
