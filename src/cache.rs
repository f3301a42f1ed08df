//! Memoization cache.
//!
//! Two independent stores — `normal` (atoms already in normal form under a
//! ruleset set) and `cache` (atoms that rewrite to something else) — each
//! behind their own `parking_lot::Mutex` so `get` and `put` on one store
//! never contend with the other.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::atom::{Atom, Fingerprint};

/// Rewrite depth is clamped into `[0, LEVEL_LIMIT - 1]` before being
/// stored. 32 comfortably covers the depths this engine's own test
/// fixtures and rule sets reach; a session
/// whose rewriting genuinely nests deeper than this just stores every
/// additional level at the ceiling, which only affects cache bookkeeping
/// metadata, not correctness.
pub const LEVEL_LIMIT: u8 = 32;

/// Assigns each ruleset name a stable bit on first mention, so an active
/// ruleset set can be packed into a single `u64`. Supports up to 64
/// distinct ruleset names per process — ample for a single engine
/// instance's rule library.
#[derive(Debug, Clone, Default)]
pub struct RulesetRegistry {
    bits: HashMap<String, u32>,
}

impl RulesetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_for(&mut self, name: &str) -> u32 {
        if let Some(&b) = self.bits.get(name) {
            return b;
        }
        let b = self.bits.len() as u32;
        assert!(b < 64, "ruleset registry exhausted its 64-bit budget");
        self.bits.insert(name.to_string(), b);
        b
    }

    pub fn set_for(&mut self, names: &[String]) -> u64 {
        names.iter().fold(0u64, |acc, name| acc | (1u64 << self.bit_for(name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub rulesets: u64,
}

/// Eviction strategy shared by both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    Fifo,
    Lru,
    Lfu,
}

/// Result of a cache lookup. Modeled as an enum rather than an
/// `(atom, bool)` pair, since the boolean's meaning differs between the
/// trivial/normal/hit cases and a bare tuple would invite mixing them up.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// `atom` was a literal or variable: no cache lookup needed at all.
    Trivial(Atom),
    /// The key is recorded as already in normal form.
    KnownNormal,
    /// The key rewrites to the given atom.
    Hit(Atom),
    Miss,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Store<V> {
    entries: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
    counts: HashMap<CacheKey, u64>,
    max_entries: usize,
    stats: CacheStats,
}

impl<V: Clone> Store<V> {
    fn new(max_entries: usize) -> Self {
        Store {
            entries: HashMap::new(),
            order: VecDeque::new(),
            counts: HashMap::new(),
            max_entries,
            stats: CacheStats::default(),
        }
    }

    /// Looks up `key`, bumping its LRU/LFU access count on a hit. Hit/miss
    /// bookkeeping lives one level up in `MemoCache`, which is the only
    /// place that knows whether a lookup against *both* stores missed.
    fn get(&mut self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key).cloned() {
            Some(v) => {
                *self.counts.entry(*key).or_insert(0) += 1;
                Some(v)
            }
            None => None,
        }
    }

    fn put(&mut self, key: CacheKey, value: V, policy: EvictionPolicy) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key);
        }
        self.entries.insert(key, value);
        self.counts.entry(key).or_insert(0);
        if self.entries.len() > self.max_entries {
            self.evict(policy);
        }
    }

    fn evict(&mut self, policy: EvictionPolicy) {
        let before = self.entries.len();
        match policy {
            EvictionPolicy::Fifo => {
                let n = self.entries.len() / 2;
                for _ in 0..n {
                    if let Some(k) = self.order.pop_front() {
                        self.entries.remove(&k);
                        self.counts.remove(&k);
                        self.stats.evictions += 1;
                    }
                }
            }
            EvictionPolicy::Lru => {
                let zero: Vec<CacheKey> = self.counts.iter().filter(|(_, &c)| c == 0).map(|(k, _)| *k).collect();
                for k in &zero {
                    self.entries.remove(k);
                    self.order.retain(|x| x != k);
                    self.counts.remove(k);
                    self.stats.evictions += 1;
                }
                for c in self.counts.values_mut() {
                    *c = 0;
                }
            }
            EvictionPolicy::Lfu => {
                let min = self.counts.values().copied().min().unwrap_or(0);
                let tied: Vec<CacheKey> = self.counts.iter().filter(|(_, &c)| c == min).map(|(k, _)| *k).collect();
                for k in &tied {
                    self.entries.remove(k);
                    self.order.retain(|x| x != k);
                    self.stats.evictions += 1;
                }
                self.counts.clear();
            }
        }
        log::debug!(
            "cache eviction sweep ({policy:?}): {before} -> {} entries",
            self.entries.len()
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.counts.clear();
        self.stats = CacheStats::default();
    }
}

/// The memoization cache: `(fingerprint, active-ruleset-bitset) →
/// rewritten atom`, with FIFO/LRU/LFU eviction.
pub struct MemoCache {
    normal: Mutex<Store<()>>,
    cache: Mutex<Store<(Atom, u8)>>,
    policy: EvictionPolicy,
    /// Logical hit/miss counters for the combined cache. A lookup counts as
    /// exactly one hit or one miss regardless of which of the two stores
    /// (or neither) answered it — tallying per-store would double-count a
    /// `normal` miss on every `cache` hit.
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

impl MemoCache {
    pub fn new(max_entries: usize, policy: EvictionPolicy) -> Self {
        MemoCache {
            normal: Mutex::new(Store::new(max_entries)),
            cache: Mutex::new(Store::new(max_entries)),
            policy,
            hits: Mutex::new(0),
            misses: Mutex::new(0),
        }
    }

    pub fn get(&self, atom: &Atom, rulesets: u64) -> CacheLookup {
        use crate::atom::Ordinal;
        if matches!(atom.ordinal(), Ordinal::Literal | Ordinal::Variable) {
            return CacheLookup::Trivial(atom.clone());
        }
        let key = CacheKey {
            fingerprint: atom.fingerprint(),
            rulesets,
        };
        if self.normal.lock().get(&key).is_some() {
            *self.hits.lock() += 1;
            log::trace!("cache hit (normal form): fingerprint={:?} rulesets={rulesets:#x}", key.fingerprint);
            return CacheLookup::KnownNormal;
        }
        match self.cache.lock().get(&key) {
            Some((cached, _level)) => {
                *self.hits.lock() += 1;
                log::trace!("cache hit: fingerprint={:?} rulesets={rulesets:#x}", key.fingerprint);
                CacheLookup::Hit(cached)
            }
            None => {
                *self.misses.lock() += 1;
                log::trace!("cache miss: fingerprint={:?} rulesets={rulesets:#x}", key.fingerprint);
                CacheLookup::Miss
            }
        }
    }

    /// `atom ≡ value` (reference equality) routes to the `normal` store;
    /// anything else routes to `cache` with `level` clamped into
    /// `[0, LEVEL_LIMIT - 1]`.
    pub fn put(&self, atom: &Atom, rulesets: u64, value: &Atom, level: u32) {
        let key = CacheKey {
            fingerprint: atom.fingerprint(),
            rulesets,
        };
        if atom.ptr_eq(value) {
            self.normal.lock().put(key, (), self.policy);
        } else {
            let clamped = level.min(LEVEL_LIMIT as u32 - 1) as u8;
            self.cache.lock().put(key, (value.clone(), clamped), self.policy);
        }
    }

    pub fn clear(&self) {
        self.normal.lock().clear();
        self.cache.lock().clear();
        *self.hits.lock() = 0;
        *self.misses.lock() = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let evictions = self.normal.lock().stats.evictions + self.cache.lock().stats.evictions;
        CacheStats {
            hits: *self.hits.lock(),
            misses: *self.misses.lock(),
            evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_and_variable_atoms_are_trivial() {
        let cache = MemoCache::new(16, EvictionPolicy::Fifo);
        assert!(matches!(cache.get(&Atom::int(1), 0), CacheLookup::Trivial(_)));
        let v = Atom::variable("x", Atom::any(), None, false);
        assert!(matches!(cache.get(&v, 0), CacheLookup::Trivial(_)));
    }

    #[test]
    fn put_same_reference_goes_to_normal() {
        let cache = MemoCache::new(16, EvictionPolicy::Fifo);
        let a = Atom::symbol("a");
        cache.put(&a, 0, &a, 0);
        assert!(matches!(cache.get(&a, 0), CacheLookup::KnownNormal));
    }

    #[test]
    fn put_different_value_goes_to_cache() {
        let cache = MemoCache::new(16, EvictionPolicy::Fifo);
        let a = Atom::symbol("a");
        let b = Atom::symbol("b");
        cache.put(&a, 0, &b, 3);
        match cache.get(&a, 0) {
            CacheLookup::Hit(atom) => assert_eq!(atom, b),
            other => panic!("expected Hit, got {:?}", other),
        }
    }

    #[test]
    fn fifo_eviction_halves_store_past_capacity() {
        let cache = MemoCache::new(4, EvictionPolicy::Fifo);
        for i in 0..8 {
            let a = Atom::symbol(format!("s{i}"));
            let b = Atom::int(i);
            cache.put(&a, 0, &b, 0);
        }
        let stats = cache.stats();
        assert!(stats.evictions > 0);
    }

    #[test]
    fn hit_does_not_count_as_a_miss() {
        let cache = MemoCache::new(16, EvictionPolicy::Fifo);
        let a = Atom::symbol("a");
        let b = Atom::symbol("b");
        cache.put(&a, 0, &b, 0);
        let before = cache.stats();
        match cache.get(&a, 0) {
            CacheLookup::Hit(_) => {}
            other => panic!("expected Hit, got {:?}", other),
        }
        let after = cache.stats();
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.misses, before.misses);
    }

    #[test]
    fn ruleset_registry_assigns_stable_bits() {
        let mut reg = RulesetRegistry::new();
        let b1 = reg.bit_for("math");
        let b2 = reg.bit_for("logic");
        assert_eq!(reg.bit_for("math"), b1);
        assert_ne!(b1, b2);
    }
}
