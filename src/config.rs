//! The property manager exposed to an executor.
//!
//! Every field here takes effect immediately for subsequent operations —
//! there is no "recompile" step. This favors a small, directly-mutable
//! configuration struct over a file format; the on-disk side of
//! configuration is explicitly an external collaborator's problem.

use crate::cache::EvictionPolicy;

/// Engine-wide tunables. Constructed with [`Config::default`] and mutated via
/// the builder-style `with_*` methods, or written to directly by an
/// [`crate::executor::Executor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Enable the memoization cache (§4.8). Disabling it does not clear
    /// existing entries; it just stops consulting and populating them.
    pub cache: bool,
    /// Atoms deeper than this are neither queried nor stored in the cache.
    /// `-1` means unbounded.
    pub max_cache_depth: i64,
    /// Wall-clock budget for a rewrite session, in seconds. `0` disables the
    /// timeout entirely.
    pub rewrite_timeout_secs: u64,
    /// Skip `depth`/`isTerm`/`otherHash` in fast-equality (§4.1).
    pub risky_equality_check: bool,
    /// Additionally require a deep structural comparison for variants where
    /// fingerprint collision has non-negligible cost (§4.1).
    pub custom_equality_check: bool,
    /// Maximum entries per cache store before eviction (§4.8).
    pub max_cache_entries: usize,
    /// Eviction policy shared by both cache stores.
    pub eviction_policy: EvictionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: true,
            max_cache_depth: -1,
            rewrite_timeout_secs: 0,
            risky_equality_check: false,
            custom_equality_check: false,
            max_cache_entries: 4096,
            eviction_policy: EvictionPolicy::Fifo,
        }
    }
}

impl Config {
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn with_max_cache_depth(mut self, depth: i64) -> Self {
        self.max_cache_depth = depth;
        self
    }

    pub fn with_rewrite_timeout_secs(mut self, secs: u64) -> Self {
        self.rewrite_timeout_secs = secs;
        self
    }

    pub fn with_risky_equality_check(mut self, risky: bool) -> Self {
        self.risky_equality_check = risky;
        self
    }

    pub fn with_custom_equality_check(mut self, custom: bool) -> Self {
        self.custom_equality_check = custom;
        self
    }

    pub fn with_max_cache_entries(mut self, entries: usize) -> Self {
        self.max_cache_entries = entries;
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = Config::default();
        assert!(cfg.cache);
        assert_eq!(cfg.max_cache_depth, -1);
        assert_eq!(cfg.rewrite_timeout_secs, 0);
        assert_eq!(cfg.max_cache_entries, 4096);
    }

    #[test]
    fn builder_methods_compose() {
        let cfg = Config::default()
            .with_cache(false)
            .with_rewrite_timeout_secs(5)
            .with_risky_equality_check(true);
        assert!(!cfg.cache);
        assert_eq!(cfg.rewrite_timeout_secs, 5);
        assert!(cfg.risky_equality_check);
    }
}
