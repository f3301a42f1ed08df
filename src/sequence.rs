//! Sequence construction and normalization.
//!
//! Normalization is purely a function of an AlgProp and a raw list of
//! elements; it never consults the cache or the rewriter. The ordered
//! passes below (absorber capture, identity elision, associative
//! flattening, commutative sort, idempotent dedup) run in that fixed
//! order — reordering them changes the fixed point, not just the
//! performance.

use std::collections::HashMap;

use im::Vector as ImVector;

use crate::algprop::{AlgProp, EffectiveProps};
use crate::atom::{Atom, AtomKind};

/// A constant-subterm index: maps a constant element's fingerprint to its
/// first position in the normalized sequence, for fast lookup during AC
/// matching.
#[derive(Debug, Clone, Default)]
pub struct ConstantIndex {
    positions: HashMap<(u64, u64), usize>,
}

impl ConstantIndex {
    pub fn build(items: &ImVector<Atom>) -> Self {
        let mut positions = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            if item.is_constant() {
                positions.entry(item.fingerprint()).or_insert(i);
            }
        }
        ConstantIndex { positions }
    }

    pub fn position_of(&self, atom: &Atom) -> Option<usize> {
        self.positions.get(&atom.fingerprint()).copied()
    }
}

/// Normalizes `items` under `props` by running the five passes in fixed
/// order. Returns `None` if any of the three boolean flags in `props` is
/// not yet a literal — the sequence cannot be normalized until that flag
/// atom is rewritten, and the caller should leave the AtomSeq as a raw,
/// unnormalized term until then.
pub fn normalize(props: &AlgProp, items: impl IntoIterator<Item = Atom>) -> Option<ImVector<Atom>> {
    let flags = props.effective_flags()?;
    let mut xs: ImVector<Atom> = items.into_iter().collect();

    // Pass 1: absorber capture.
    if let Some(absorber) = &props.absorber {
        if xs.iter().any(|x| x == absorber) {
            let mut singleton = ImVector::new();
            singleton.push_back(absorber.clone());
            return Some(singleton);
        }
    }

    // Pass 2: identity elision.
    if let Some(identity) = &props.identity {
        xs = xs.into_iter().filter(|x| x != identity).collect();
    }

    // Pass 3: associative flattening.
    if flags.associative {
        xs = flatten_one_level(props, xs);
    }

    // Pass 4: commutative sort.
    if flags.associative && flags.commutative {
        let mut v: Vec<Atom> = xs.into_iter().collect();
        v.sort();
        xs = v.into_iter().collect();
    }

    // Pass 5: idempotent dedup, preserving first occurrence.
    if flags.idempotent {
        xs = dedup_preserve_order(xs);
    }

    Some(xs)
}

fn flatten_one_level(props: &AlgProp, xs: ImVector<Atom>) -> ImVector<Atom> {
    let mut out = ImVector::new();
    for item in xs {
        match item.kind() {
            AtomKind::AtomSeq(seq) if seq.props.structurally_eq(props) => {
                for nested in seq.items.iter() {
                    out.push_back(nested.clone());
                }
            }
            _ => out.push_back(item),
        }
    }
    out
}

fn dedup_preserve_order(xs: ImVector<Atom>) -> ImVector<Atom> {
    let mut seen: Vec<Atom> = Vec::new();
    let mut out = ImVector::new();
    for item in xs {
        if !seen.iter().any(|s| s == &item) {
            seen.push(item.clone());
            out.push_back(item);
        }
    }
    out
}

/// Builds a normalized AtomSeq atom. Returns the raw, unnormalized sequence
/// atom (with the same properties and elements, in the order given) if the
/// flags are not yet resolved, so callers always get back *some* atom to
/// keep rewriting with rather than an error.
pub fn construct(props: AlgProp, items: impl IntoIterator<Item = Atom>, ty: Atom) -> Atom {
    let items: ImVector<Atom> = items.into_iter().collect();
    match normalize(&props, items.clone()) {
        Some(normalized) => Atom::atom_seq(props, normalized, ty),
        None => Atom::atom_seq(props, items, ty),
    }
}

pub fn effective_flags_or_default(props: &AlgProp) -> EffectiveProps {
    props.effective_flags().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ac_props() -> AlgProp {
        AlgProp::new(true, true, false, None, None)
    }

    #[test]
    fn commutative_sorts_by_total_order() {
        let props = ac_props();
        let xs = normalize(&props, vec![Atom::int(3), Atom::int(1), Atom::int(2)]).unwrap();
        assert_eq!(xs.len(), 3);
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);
    }

    #[test]
    fn identity_elided() {
        let props = AlgProp::new(true, false, false, None, Some(Atom::int(0)));
        let xs = normalize(&props, vec![Atom::int(1), Atom::int(0), Atom::int(2), Atom::int(0)]).unwrap();
        assert_eq!(xs.len(), 2);
    }

    #[test]
    fn absorber_collapses_to_singleton() {
        let bottom = Atom::symbol("bottom");
        let props = AlgProp::new(true, true, false, Some(bottom.clone()), None);
        let xs = normalize(&props, vec![Atom::int(1), bottom.clone(), Atom::int(2)]).unwrap();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0], bottom);
    }

    #[test]
    fn idempotent_dedups_preserving_first_occurrence() {
        let props = AlgProp::new(true, false, true, None, None);
        let xs = normalize(&props, vec![Atom::int(1), Atom::int(2), Atom::int(1)]).unwrap();
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0], Atom::int(1));
        assert_eq!(xs[1], Atom::int(2));
    }

    #[test]
    fn associative_flattens_nested_sequence_with_equal_properties() {
        let props = AlgProp::new(true, false, false, None, None);
        let inner = Atom::atom_seq(props.clone(), vec![Atom::int(2), Atom::int(3)], Atom::any());
        let xs = normalize(&props, vec![Atom::int(1), inner, Atom::int(4)]).unwrap();
        assert_eq!(xs.len(), 4);
    }

    #[test]
    fn unresolved_flag_returns_none() {
        let props = AlgProp {
            associative: Some(Atom::variable("flag", Atom::any(), None, false)),
            ..AlgProp::none()
        };
        assert!(normalize(&props, vec![Atom::int(1)]).is_none());
    }

    #[test]
    fn constant_index_finds_first_position() {
        let idx = ConstantIndex::build(&vec![Atom::int(1), Atom::int(2), Atom::int(1)].into_iter().collect());
        assert_eq!(idx.position_of(&Atom::int(1)), Some(0));
        assert_eq!(idx.position_of(&Atom::int(2)), Some(1));
        assert_eq!(idx.position_of(&Atom::int(3)), None);
    }
}
