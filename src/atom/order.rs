//! Total order and the two equality checks the matcher and cache use: a
//! full structural comparison ([`atoms_equal`], the ground truth) and a
//! configurable shortcut over fingerprints ([`fast_eq`]).

use std::cmp::Ordering;

use super::{Atom, AtomKind, VarData};

/// Ground-truth structural equality: same variant, same declared fields,
/// recursively. Lambdas compare up to alpha-equivalence rather than
/// literal bound-variable names. Per §4.1, two atoms with the same variant
/// and fields but different declared types are still distinct, since the
/// fingerprint folds the type in ([`super::hash::compute_fingerprint`]).
pub fn atoms_equal(a: &Atom, b: &Atom) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if !types_eq(a, b) {
        return false;
    }
    match (a.kind(), b.kind()) {
        (AtomKind::Literal(x), AtomKind::Literal(y)) => x == y,
        (AtomKind::AlgProp(x), AtomKind::AlgProp(y)) => x.structurally_eq(y),
        (AtomKind::MetaVariable(x), AtomKind::MetaVariable(y))
        | (AtomKind::Variable(x), AtomKind::Variable(y)) => var_data_eq(x, y),
        (AtomKind::Apply(x), AtomKind::Apply(y)) => x.op == y.op && x.arg == y.arg,
        (AtomKind::AtomSeq(x), AtomKind::AtomSeq(y)) => {
            x.props.structurally_eq(&y.props) && x.items.len() == y.items.len() && x.items.iter().zip(y.items.iter()).all(|(p, q)| p == q)
        }
        (AtomKind::BindingsAtom(x), AtomKind::BindingsAtom(y)) => {
            x.len() == y.len() && x.iter().all(|(name, value)| y.get(name).map(|v| v == value).unwrap_or(false))
        }
        (AtomKind::Lambda(x), AtomKind::Lambda(y)) => {
            x.var_type == y.var_type && lambda_bodies_alpha_eq(&x.var_name, &x.body, &y.var_name, &y.body)
        }
        (AtomKind::MapPair(xl, xr), AtomKind::MapPair(yl, yr)) => xl == yl && xr == yr,
        (AtomKind::MatchAtom(x), AtomKind::MatchAtom(y)) => {
            x.pattern_rewrite == y.pattern_rewrite
                && x.guards.len() == y.guards.len()
                && x.guards.iter().zip(y.guards.iter()).all(|(p, q)| p == q)
        }
        (AtomKind::SpecialForm(x), AtomKind::SpecialForm(y)) => x.kind == y.kind,
        (AtomKind::RulesetRef(x), AtomKind::RulesetRef(y)) => x == y,
        (AtomKind::OperatorRef(x), AtomKind::OperatorRef(y)) => x == y,
        (AtomKind::NamedRootType(x), AtomKind::NamedRootType(y)) => x == y,
        _ => false,
    }
}

/// Equality of two atoms' declared types. Both self-typed (the Type
/// Universe) short-circuits to `true` without recursing into `type_of()`,
/// which would otherwise loop forever on that one atom.
fn types_eq(a: &Atom, b: &Atom) -> bool {
    match (a.is_self_typed(), b.is_self_typed()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => atoms_equal(&a.type_of(), &b.type_of()),
    }
}

fn var_data_eq(a: &VarData, b: &VarData) -> bool {
    a.name == b.name && a.ty == b.ty && a.guard == b.guard && a.labels == b.labels && a.by_name == b.by_name
}

fn lambda_bodies_alpha_eq(a_var: &str, a_body: &Atom, b_var: &str, b_body: &Atom) -> bool {
    if a_var == b_var {
        return a_body == b_body;
    }
    let renamed = rename_free(b_body, b_var, a_var);
    a_body == &renamed
}

/// Rebuilds `atom` with every free occurrence of `from` renamed to `to`.
/// Stops descending into a nested binder that rebinds `from` (shadowing).
pub(crate) fn rename_free(atom: &Atom, from: &str, to: &str) -> Atom {
    match atom.kind() {
        AtomKind::Variable(v) if v.name == from => {
            Atom::variable_labeled(to, v.ty.clone(), Some(v.guard.clone()), v.by_name, v.labels.clone())
        }
        AtomKind::MetaVariable(v) if v.name == from => {
            Atom::metavariable(to, v.ty.clone(), Some(v.guard.clone()), v.by_name)
        }
        AtomKind::Apply(d) => {
            let ty = atom.type_of();
            Atom::simple_apply(rename_free(&d.op, from, to), rename_free(&d.arg, from, to), ty)
        }
        AtomKind::AtomSeq(d) => {
            let ty = atom.type_of();
            Atom::atom_seq(d.props.clone(), d.items.iter().map(|a| rename_free(a, from, to)), ty)
        }
        AtomKind::MapPair(l, r) => Atom::map_pair(rename_free(l, from, to), rename_free(r, from, to)),
        AtomKind::Lambda(d) if d.var_name == from => atom.clone(),
        AtomKind::Lambda(d) => Atom::lambda(d.var_name.clone(), d.var_type.clone(), rename_free(&d.body, from, to)),
        _ => atom.clone(),
    }
}

/// Configurable approximate equality, used where the matcher/cache need
/// speed over certainty, gated by [`crate::config::Config`].
///
/// `risky` skips the `depth`/`isTerm`/`otherHash` cross-checks and trusts
/// the primary hash alone. `custom` forces a full [`atoms_equal`] for
/// variants where a fingerprint collision is cheap to produce by accident
/// (AlgProp, BindingsAtom, Lambda) even when every cheap check passed.
pub fn fast_eq(a: &Atom, b: &Atom, risky: bool, custom: bool) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if !risky {
        if a.depth() != b.depth() || a.is_constant() != b.is_constant() || a.is_term() != b.is_term() {
            return false;
        }
    }
    if a.hash_value() != b.hash_value() {
        return false;
    }
    if !risky && a.other_hash_value() != b.other_hash_value() {
        return false;
    }
    if custom && matches!(a.ordinal(), super::Ordinal::AlgProp | super::Ordinal::BindingsAtom | super::Ordinal::Lambda) {
        return atoms_equal(a, b);
    }
    true
}

/// The engine's total order: the Type Universe orders above every other
/// atom, then by variant ordinal, then by declared type (recursively), then
/// by declared fields in order. Variables and metavariables tie-break by
/// name alone (their guard is not consulted for ordering, only equality).
pub fn cmp_atoms(a: &Atom, b: &Atom) -> Ordering {
    if a.ptr_eq(b) {
        return Ordering::Equal;
    }
    match (a.is_self_typed(), b.is_self_typed()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ord = a.ordinal().cmp(&b.ordinal());
    if ord != Ordering::Equal {
        return ord;
    }
    let ty_ord = cmp_atoms(&a.type_of(), &b.type_of());
    if ty_ord != Ordering::Equal {
        return ty_ord;
    }
    match (a.kind(), b.kind()) {
        (AtomKind::Literal(x), AtomKind::Literal(y)) => x.cmp(y),
        (AtomKind::AlgProp(x), AtomKind::AlgProp(y)) => cmp_opt_atom(&x.associative, &y.associative)
            .then_with(|| cmp_opt_atom(&x.commutative, &y.commutative))
            .then_with(|| cmp_opt_atom(&x.idempotent, &y.idempotent))
            .then_with(|| cmp_opt_atom(&x.absorber, &y.absorber))
            .then_with(|| cmp_opt_atom(&x.identity, &y.identity)),
        (AtomKind::MetaVariable(x), AtomKind::MetaVariable(y)) | (AtomKind::Variable(x), AtomKind::Variable(y)) => {
            x.name.cmp(&y.name)
        }
        (AtomKind::Apply(x), AtomKind::Apply(y)) => cmp_atoms(&x.op, &y.op).then_with(|| cmp_atoms(&x.arg, &y.arg)),
        (AtomKind::AtomSeq(x), AtomKind::AtomSeq(y)) => x
            .items
            .len()
            .cmp(&y.items.len())
            .then_with(|| {
                x.items
                    .iter()
                    .zip(y.items.iter())
                    .map(|(p, q)| cmp_atoms(p, q))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
        (AtomKind::BindingsAtom(x), AtomKind::BindingsAtom(y)) => x.len().cmp(&y.len()),
        (AtomKind::Lambda(x), AtomKind::Lambda(y)) => x.var_name.cmp(&y.var_name).then_with(|| cmp_atoms(&x.body, &y.body)),
        (AtomKind::MapPair(xl, xr), AtomKind::MapPair(yl, yr)) => cmp_atoms(xl, yl).then_with(|| cmp_atoms(xr, yr)),
        (AtomKind::MatchAtom(x), AtomKind::MatchAtom(y)) => cmp_atoms(&x.pattern_rewrite, &y.pattern_rewrite),
        (AtomKind::SpecialForm(_), AtomKind::SpecialForm(_)) => a.hash_value().cmp(&b.hash_value()),
        (AtomKind::RulesetRef(x), AtomKind::RulesetRef(y)) => x.cmp(y),
        (AtomKind::OperatorRef(x), AtomKind::OperatorRef(y)) => x.cmp(y),
        (AtomKind::NamedRootType(x), AtomKind::NamedRootType(y)) => x.cmp(y),
        _ => unreachable!("ordinal equality implies matching variant"),
    }
}

fn cmp_opt_atom(a: &Option<Atom>, b: &Option<Atom>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => cmp_atoms(x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    #[test]
    fn literals_order_by_value() {
        assert!(Atom::int(1) < Atom::int(2));
    }

    #[test]
    fn variants_order_by_ordinal() {
        assert!(Atom::int(1) < Atom::symbol("z"));
        assert!(Atom::symbol("z") < Atom::variable("x", Atom::any(), None, false));
    }

    #[test]
    fn alpha_equivalent_lambdas_are_equal() {
        let a = Atom::lambda("x", Atom::any(), Atom::variable("x", Atom::any(), None, false));
        let b = Atom::lambda("y", Atom::any(), Atom::variable("y", Atom::any(), None, false));
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn distinct_lambda_bodies_are_unequal() {
        let a = Atom::lambda("x", Atom::any(), Atom::variable("x", Atom::any(), None, false));
        let b = Atom::lambda("x", Atom::any(), Atom::int(0));
        assert_ne!(a, b);
    }

    #[test]
    fn atoms_differing_only_in_declared_type_are_unequal() {
        let f = Atom::operator_ref("f");
        let a = Atom::simple_apply(f.clone(), Atom::int(1), Atom::any());
        let b = Atom::simple_apply(f, Atom::int(1), Atom::symbol("T"));
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(cmp_atoms(&a, &b), Ordering::Equal);
    }

    #[test]
    fn type_universe_orders_above_every_other_atom() {
        assert!(Atom::any() < Atom::type_universe());
        assert!(Atom::symbol("Type") < Atom::type_universe());
    }

    #[test]
    fn fast_eq_risky_skips_depth_check() {
        let a = Atom::int(1);
        let b = Atom::int(1);
        assert!(fast_eq(&a, &b, true, false));
        assert!(fast_eq(&a, &b, false, false));
    }
}
