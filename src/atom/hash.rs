//! Two independent structural hashes per atom, combined into a single
//! fingerprint. Using two unrelated hashers (`SipHash` via
//! [`DefaultHasher`] and `ahash`) keeps the false-positive rate of the
//! `(hash, otherHash)` pair used as an identity proxy in the memo cache
//! acceptably low without needing a cryptographic hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use ahash::AHasher;

use super::{AtomKind, VarData};
use crate::atom::Atom;

/// A `(hash, otherHash)` pair, used as the engine's identity proxy.
pub type Fingerprint = (u64, u64);

/// Sentinel fingerprint substituted for bound-variable occurrences when
/// computing a lambda's fingerprint, so alpha-equivalent lambdas
/// (`\x.x` and `\y.y`) fingerprint identically.
const BOUND_VAR_SENTINEL: Fingerprint = (0x8e47_a1c3_0b6d_9f21, 0x1d4f_7c69_2a35_ee08);

fn combine(ordinal: u8, parts: &[Fingerprint]) -> Fingerprint {
    let mut h1 = DefaultHasher::new();
    let mut h2 = AHasher::default();
    ordinal.hash(&mut h1);
    ordinal.hash(&mut h2);
    for (a, b) in parts {
        a.hash(&mut h1);
        b.hash(&mut h2);
    }
    (h1.finish(), h2.finish())
}

fn var_fingerprint(v: &VarData) -> Fingerprint {
    let (g1, g2) = (v.guard.hash_value(), v.guard.other_hash_value());
    let mut h1 = DefaultHasher::new();
    let mut h2 = AHasher::default();
    v.name.hash(&mut h1);
    v.name.hash(&mut h2);
    v.by_name.hash(&mut h1);
    v.by_name.hash(&mut h2);
    for label in &v.labels {
        label.hash(&mut h1);
        label.hash(&mut h2);
    }
    g1.hash(&mut h1);
    g2.hash(&mut h2);
    (h1.finish(), h2.finish())
}

/// Computes the fingerprint of a freshly constructed (non-lambda) atom from
/// its kind and its already-known type fingerprint. Children are folded in
/// via their own precomputed fingerprints, so this is O(local structure),
/// never O(subtree size).
pub(crate) fn compute_fingerprint(kind: &AtomKind, ordinal: u8, ty_fp: Fingerprint) -> Fingerprint {
    let body_fp = match kind {
        AtomKind::Literal(lit) => {
            let mut h1 = DefaultHasher::new();
            let mut h2 = AHasher::default();
            lit.hash(&mut h1);
            lit.hash(&mut h2);
            (h1.finish(), h2.finish())
        }
        AtomKind::AlgProp(props) => {
            let parts: Vec<Fingerprint> = [
                &props.associative,
                &props.commutative,
                &props.idempotent,
                &props.absorber,
                &props.identity,
            ]
            .iter()
            .map(|opt| opt.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)))
            .collect();
            combine(1, &parts)
        }
        AtomKind::MetaVariable(v) | AtomKind::Variable(v) => var_fingerprint(v),
        AtomKind::Apply(data) => combine(4, &[data.op.fingerprint(), data.arg.fingerprint()]),
        AtomKind::AtomSeq(seq) => {
            let props_fp = combine(
                1,
                &[
                    seq.props.associative.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)),
                    seq.props.commutative.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)),
                    seq.props.idempotent.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)),
                    seq.props.absorber.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)),
                    seq.props.identity.as_ref().map(|a| a.fingerprint()).unwrap_or((0, 0)),
                ],
            );
            let mut parts = vec![props_fp];
            parts.extend(seq.items.iter().map(|a| a.fingerprint()));
            combine(5, &parts)
        }
        AtomKind::BindingsAtom(bindings) => {
            let mut entries: Vec<(&String, Fingerprint)> =
                bindings.iter().map(|(k, v)| (k, v.fingerprint())).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut h1 = DefaultHasher::new();
            let mut h2 = AHasher::default();
            for (name, fp) in entries {
                name.hash(&mut h1);
                name.hash(&mut h2);
                fp.hash(&mut h1);
                fp.hash(&mut h2);
            }
            (h1.finish(), h2.finish())
        }
        AtomKind::Lambda(data) => lambda_fingerprint(&data.var_name, &data.body),
        AtomKind::MapPair(l, r) => combine(8, &[l.fingerprint(), r.fingerprint()]),
        AtomKind::MatchAtom(data) => {
            let mut parts = vec![data.pattern_rewrite.fingerprint()];
            parts.extend(data.guards.iter().map(|g| g.fingerprint()));
            combine(9, &parts)
        }
        AtomKind::SpecialForm(data) => {
            let mut h1 = DefaultHasher::new();
            let mut h2 = AHasher::default();
            format!("{:?}", data.kind).hash(&mut h1);
            format!("{:?}", data.kind).hash(&mut h2);
            (h1.finish(), h2.finish())
        }
        AtomKind::RulesetRef(name) | AtomKind::OperatorRef(name) | AtomKind::NamedRootType(name) => {
            let mut h1 = DefaultHasher::new();
            let mut h2 = AHasher::default();
            name.hash(&mut h1);
            name.hash(&mut h2);
            (h1.finish(), h2.finish())
        }
    };
    combine(ordinal, &[body_fp, ty_fp])
}

/// Computes a lambda's fingerprint such that alpha-equivalent lambdas
/// fingerprint identically: free occurrences of the bound variable within
/// the body contribute a fixed sentinel instead of their own fingerprint.
/// Nested binders are treated as opaque (their own fingerprint was already
/// alpha-normalized when *they* were constructed), so this walk is linear
/// in the body's surface structure, not its full size.
fn lambda_fingerprint(var_name: &str, body: &Atom) -> Fingerprint {
    let fp = free_occurrence_fingerprint(var_name, body);
    combine(7, &[fp])
}

fn free_occurrence_fingerprint(var_name: &str, atom: &Atom) -> Fingerprint {
    match atom.kind() {
        AtomKind::Variable(v) | AtomKind::MetaVariable(v) if v.name == var_name => BOUND_VAR_SENTINEL,
        AtomKind::Apply(data) => combine(
            4,
            &[
                free_occurrence_fingerprint(var_name, &data.op),
                free_occurrence_fingerprint(var_name, &data.arg),
            ],
        ),
        AtomKind::AtomSeq(seq) => {
            let parts: Vec<Fingerprint> = seq
                .items
                .iter()
                .map(|a| free_occurrence_fingerprint(var_name, a))
                .collect();
            combine(5, &parts)
        }
        AtomKind::MapPair(l, r) => combine(
            8,
            &[
                free_occurrence_fingerprint(var_name, l),
                free_occurrence_fingerprint(var_name, r),
            ],
        ),
        // Lambda rebinding the same name shadows it; any other lambda is
        // still searched, but its own fingerprint already reflects its body
        // so we do not need to unwrap further than one level of its binder.
        AtomKind::Lambda(inner) if inner.var_name == var_name => atom.fingerprint(),
        AtomKind::Lambda(inner) => combine(7, &[free_occurrence_fingerprint(var_name, &inner.body)]),
        _ => atom.fingerprint(),
    }
}
