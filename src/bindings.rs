//! Bindings: an immutable name → atom map, with optional side caches used
//! only during a single AC-matching session.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use im::{HashMap as ImHashMap, Vector as ImVector};

use crate::atom::Atom;

type SideCache = Rc<RefCell<Option<ImVector<Atom>>>>;

/// An immutable mapping from variable names to atoms. Cloning is cheap
/// (structural sharing via `im::HashMap`); the two side caches are shared
/// across clones, since they exist only to pass scratch state between
/// recursive calls within one matching attempt, not to carry semantic
/// content.
#[derive(Clone)]
pub struct Bindings {
    map: ImHashMap<String, Atom>,
    pattern_cache: SideCache,
    subject_cache: SideCache,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self {
            map: ImHashMap::new(),
            pattern_cache: Rc::new(RefCell::new(None)),
            subject_cache: Rc::new(RefCell::new(None)),
        }
    }

    /// `binds + (name, value)`: returns a new Bindings with `name` bound.
    pub fn insert(&self, name: impl Into<String>, value: Atom) -> Bindings {
        Bindings {
            map: self.map.update(name.into(), value),
            pattern_cache: Rc::new(RefCell::new(None)),
            subject_cache: Rc::new(RefCell::new(None)),
        }
    }

    /// `binds ++ other`: right-biased union.
    pub fn merge(&self, other: &Bindings) -> Bindings {
        Bindings {
            map: self.map.clone().union(other.map.clone()),
            pattern_cache: Rc::new(RefCell::new(None)),
            subject_cache: Rc::new(RefCell::new(None)),
        }
    }

    /// `binds - name`: returns a new Bindings with `name` unbound.
    pub fn remove(&self, name: &str) -> Bindings {
        Bindings {
            map: self.map.without(name),
            pattern_cache: Rc::new(RefCell::new(None)),
            subject_cache: Rc::new(RefCell::new(None)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Atom> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Atom)> {
        self.map.iter()
    }

    /// Reads and clears the pattern-sequence side cache. Extracted exactly
    /// once: the second read in the same matching attempt sees `None`.
    pub fn take_pattern_cache(&self) -> Option<ImVector<Atom>> {
        self.pattern_cache.borrow_mut().take()
    }

    pub fn set_pattern_cache(&self, seq: ImVector<Atom>) {
        *self.pattern_cache.borrow_mut() = Some(seq);
    }

    pub fn take_subject_cache(&self) -> Option<ImVector<Atom>> {
        self.subject_cache.borrow_mut().take()
    }

    pub fn set_subject_cache(&self, seq: ImVector<Atom>) {
        *self.subject_cache.borrow_mut() = Some(seq);
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    #[test]
    fn insert_and_get() {
        let b = Bindings::new().insert("x", Atom::int(1));
        assert_eq!(b.get("x"), Some(&Atom::int(1)));
        assert_eq!(b.get("y"), None);
    }

    #[test]
    fn remove_clears_binding() {
        let b = Bindings::new().insert("x", Atom::int(1));
        let b2 = b.remove("x");
        assert!(!b2.contains("x"));
        assert!(b.contains("x"), "original bindings are unaffected");
    }

    #[test]
    fn merge_is_right_biased() {
        let a = Bindings::new().insert("x", Atom::int(1));
        let b = Bindings::new().insert("x", Atom::int(2)).insert("y", Atom::int(3));
        let merged = a.merge(&b);
        assert_eq!(merged.get("x"), Some(&Atom::int(2)));
        assert_eq!(merged.get("y"), Some(&Atom::int(3)));
    }

    #[test]
    fn side_cache_reads_exactly_once() {
        let b = Bindings::new();
        b.set_pattern_cache(im::Vector::new());
        assert!(b.take_pattern_cache().is_some());
        assert!(b.take_pattern_cache().is_none());
    }
}
