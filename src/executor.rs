//! The Executor: owns every piece of shared, mutable engine state. All
//! read/write paths into that state go through an `Executor` handle rather
//! than ambient globals.
//!
//! Everything here is `RefCell`-guarded rather than `Mutex`-guarded, except
//! the memo cache (which has its own internal mutexes): the engine's
//! concurrency model is single-threaded-cooperative, so an `Executor` is
//! meant to be used from one thread at a time, typically wrapped in an
//! `Rc` when multiple owners need it.

use std::cell::RefCell;

use crate::cache::{EvictionPolicy, MemoCache, RulesetRegistry};
use crate::config::Config;
use crate::operators::OperatorLibrary;
use crate::rules::{RuleLibrary, RuleStats};
use crate::trace::SharedTrace;

/// Ties together the operator library, rule library, memoization cache,
/// ruleset bit registry, configuration, and trace sink — the single point
/// of entry for rewriting.
pub struct Executor {
    pub(crate) operators: RefCell<OperatorLibrary>,
    pub(crate) rules: RefCell<RuleLibrary>,
    pub(crate) cache: RefCell<MemoCache>,
    pub(crate) rulesets: RefCell<RulesetRegistry>,
    pub(crate) config: RefCell<Config>,
    pub(crate) rule_stats: RefCell<RuleStats>,
    pub(crate) trace: SharedTrace,
}

impl Executor {
    pub fn new() -> Self {
        let config = Config::default();
        let cache = MemoCache::new(config.max_cache_entries, config.eviction_policy);
        Executor {
            operators: RefCell::new(OperatorLibrary::new()),
            rules: RefCell::new(RuleLibrary::new()),
            cache: RefCell::new(cache),
            rulesets: RefCell::new(RulesetRegistry::new()),
            config: RefCell::new(config),
            rule_stats: RefCell::new(RuleStats::default()),
            trace: SharedTrace::null(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        let executor = Self::new();
        executor.set_config(config);
        executor
    }

    pub fn with_trace(mut self, trace: SharedTrace) -> Self {
        self.trace = trace;
        self
    }

    pub fn config(&self) -> Config {
        self.config.borrow().clone()
    }

    /// Replaces the configuration, rebuilding the memo cache if its sizing
    /// or eviction policy changed. Changes take effect immediately for
    /// subsequent operations.
    pub fn set_config(&self, config: Config) {
        let rebuild_cache = {
            let current = self.config.borrow();
            current.max_cache_entries != config.max_cache_entries || current.eviction_policy != config.eviction_policy
        };
        if rebuild_cache {
            *self.cache.borrow_mut() = MemoCache::new(config.max_cache_entries, config.eviction_policy);
        }
        *self.config.borrow_mut() = config;
    }

    pub fn add_rule(&self, rule: crate::rules::Rule) {
        self.rules.borrow_mut().add_rule(rule);
    }

    pub fn register_operator(&self, op: crate::operators::Operator) -> Result<(), crate::error::ElisionError> {
        self.operators.borrow_mut().register(op)
    }

    pub fn ruleset_bitset(&self, names: &[String]) -> u64 {
        self.rulesets.borrow_mut().set_for(names)
    }

    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.borrow().stats()
    }

    pub fn rule_stats(&self) -> RuleStats {
        self.rule_stats.borrow().clone()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow().clear();
    }

    pub fn set_trace(&mut self, trace: SharedTrace) {
        self.trace = trace;
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_executor_has_builtin_operators() {
        let exec = Executor::new();
        assert!(exec.operators.borrow().get("MAP").is_some());
    }

    #[test]
    fn set_config_rebuilds_cache_on_policy_change() {
        let exec = Executor::new();
        exec.set_config(Config::default().with_eviction_policy(EvictionPolicy::Lru));
        assert_eq!(exec.config().eviction_policy, EvictionPolicy::Lru);
    }
}
