//! Pattern matcher.
//!
//! The matcher never touches the cache or rule library directly; guard
//! evaluation and lambda-body rewriting need the rewriter's services
//! (invoking a rewriter atom, applying an applicable atom, rewriting a
//! guard expression), so those are abstracted behind [`RewriteHost`] and
//! supplied by whatever owns both the matcher and rewriter (the
//! [`crate::executor::Executor`]). This keeps the matcher ignorant of
//! operators and rules, depending only on bindings, algebraic properties,
//! and sequence normalization.

use im::Vector as ImVector;
use itertools::Itertools;

use crate::atom::{Atom, AtomKind, Literal};
use crate::bindings::Bindings;
use crate::sequence::{self, ConstantIndex};

/// Why a match attempt failed, with enough structure to explain nested
/// failures: a reason, the pattern/subject pair involved, and an optional
/// inner cause.
#[derive(Debug, Clone)]
pub struct MatchFailure {
    pub reason: String,
    pub pattern: Atom,
    pub subject: Atom,
    pub caused_by: Option<Box<MatchFailure>>,
}

impl MatchFailure {
    fn new(reason: impl Into<String>, pattern: &Atom, subject: &Atom) -> Self {
        MatchFailure {
            reason: reason.into(),
            pattern: pattern.clone(),
            subject: subject.clone(),
            caused_by: None,
        }
    }

    fn because(reason: impl Into<String>, pattern: &Atom, subject: &Atom, cause: MatchFailure) -> Self {
        MatchFailure {
            reason: reason.into(),
            pattern: pattern.clone(),
            subject: subject.clone(),
            caused_by: Some(Box::new(cause)),
        }
    }
}

/// The result of a match attempt. `Many` collects every successful binding
/// set up front rather than exposing a lazy iterator — the enumeration
/// order (§5: "lexicographic over partitions then permutations") is
/// preserved in the `Vec`'s order.
#[derive(Debug, Clone)]
pub enum Outcome {
    Match(Bindings),
    Many(Vec<Bindings>),
    Fail(MatchFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Fail(_))
    }

    /// All binding sets this outcome represents, in order.
    pub fn into_bindings_vec(self) -> Vec<Bindings> {
        match self {
            Outcome::Match(b) => vec![b],
            Outcome::Many(bs) => bs,
            Outcome::Fail(_) => vec![],
        }
    }
}

/// Services the matcher needs from whatever owns the rewriter, to evaluate
/// variable guards and lambda bodies without depending on C6/C9 directly.
pub trait RewriteHost {
    fn rewrite(&self, atom: &Atom, binds: &Bindings) -> (Atom, bool);
    fn is_rewriter(&self, atom: &Atom) -> bool;
    fn is_applicable(&self, atom: &Atom) -> bool;
    /// Invokes a rewriter atom on `subject`; `None` means it declined (did
    /// not fire), distinct from firing and producing the same atom back.
    fn invoke_rewriter(&self, rewriter: &Atom, subject: &Atom) -> Option<Atom>;
    fn invoke_applicable(&self, applicable: &Atom, arg: &Atom) -> Atom;
    /// Equality used liberally by the matcher to short-circuit comparisons,
    /// honoring the host's configured `risky_equality_check`/
    /// `custom_equality_check` toggles. Defaults to full structural
    /// equality for hosts that don't configure the shortcut.
    fn fast_eq(&self, a: &Atom, b: &Atom) -> bool {
        a == b
    }
}

/// `match(pattern, subject, binds, hint) → Outcome`.
pub fn match_atoms(pattern: &Atom, subject: &Atom, binds: &Bindings, host: &dyn RewriteHost, hint: Option<&Atom>) -> Outcome {
    if crate::deadline::expired() {
        return Outcome::Fail(MatchFailure::new("timed out", pattern, subject));
    }

    let pattern_is_bindable_var = matches!(pattern.kind(), AtomKind::Variable(_));
    if is_any_type(subject) && !pattern_is_bindable_var {
        return Outcome::Match(binds.clone());
    }

    if pattern.depth() > subject.depth() {
        return Outcome::Fail(MatchFailure::new("pattern deeper than subject", pattern, subject));
    }

    if pattern.is_constant() {
        if host.fast_eq(pattern, subject) {
            return Outcome::Match(binds.clone());
        }
        // A constant pattern that isn't literally the subject can still
        // fail structurally below if it's not actually a leaf (e.g. a
        // constant AtomSeq); let dispatch decide.
    }

    if !pattern_is_bindable_var {
        match match_atoms(&pattern.type_of(), &subject.type_of(), binds, host, None) {
            Outcome::Fail(f) => {
                return Outcome::Fail(MatchFailure::because("type mismatch", pattern, subject, f));
            }
            Outcome::Match(b2) => {
                return dispatch(pattern, subject, &b2, host, hint);
            }
            Outcome::Many(many) => {
                let mut out = Vec::new();
                for b2 in many {
                    out.extend(dispatch(pattern, subject, &b2, host, hint).into_bindings_vec());
                }
                return if out.is_empty() {
                    Outcome::Fail(MatchFailure::new("no type-consistent dispatch succeeded", pattern, subject))
                } else {
                    Outcome::Many(out)
                };
            }
        }
    }

    dispatch(pattern, subject, binds, host, hint)
}

fn is_any_type(subject: &Atom) -> bool {
    matches!(subject.kind(), AtomKind::NamedRootType(name) if name == "Any")
}

fn is_none_type(atom: &Atom) -> bool {
    matches!(atom.kind(), AtomKind::NamedRootType(name) if name == "None")
}

fn dispatch(pattern: &Atom, subject: &Atom, binds: &Bindings, host: &dyn RewriteHost, _hint: Option<&Atom>) -> Outcome {
    match pattern.kind() {
        AtomKind::Literal(p) => match subject.kind() {
            AtomKind::Literal(s) if p == s => Outcome::Match(binds.clone()),
            _ => Outcome::Fail(MatchFailure::new("literal mismatch", pattern, subject)),
        },
        AtomKind::Variable(v) => match_variable(v, pattern, subject, binds, host),
        AtomKind::Apply(p) => match_apply(p, pattern, subject, binds, host),
        AtomKind::AtomSeq(p) => match_atom_seq(p, pattern, subject, binds, host),
        AtomKind::Lambda(p) => match_lambda(p, pattern, subject, binds, host),
        AtomKind::NamedRootType(name) => {
            if name == "Any" {
                Outcome::Match(binds.clone())
            } else if is_none_type(subject) || matches!(subject.kind(), AtomKind::NamedRootType(n) if n == name) {
                Outcome::Match(binds.clone())
            } else {
                Outcome::Fail(MatchFailure::new("root type mismatch", pattern, subject))
            }
        }
        _ => {
            if pattern == subject {
                Outcome::Match(binds.clone())
            } else {
                Outcome::Fail(MatchFailure::new("self-matching variant mismatch", pattern, subject))
            }
        }
    }
}

fn match_variable(v: &crate::atom::VarData, pattern: &Atom, subject: &Atom, binds: &Bindings, host: &dyn RewriteHost) -> Outcome {
    if v.by_name {
        return match subject.kind() {
            AtomKind::Variable(sv) if sv.name == v.name => Outcome::Match(binds.clone()),
            _ => Outcome::Fail(MatchFailure::new("by-name variable requires matching name", pattern, subject)),
        };
    }

    if let Some(bound) = binds.get(&v.name) {
        return if host.fast_eq(bound, subject) || is_any_type(bound) {
            Outcome::Match(binds.clone())
        } else {
            Outcome::Fail(MatchFailure::new("variable already bound to a different atom", pattern, subject))
        };
    }

    if host.is_rewriter(&v.guard) {
        return match host.invoke_rewriter(&v.guard, subject) {
            Some(_) => Outcome::Match(binds.insert(v.name.clone(), subject.clone())),
            None => Outcome::Fail(MatchFailure::new("guard rewriter declined", pattern, subject)),
        };
    }

    if host.is_applicable(&v.guard) {
        let _ = host.invoke_applicable(&v.guard, subject);
        return Outcome::Match(binds.insert(v.name.clone(), subject.clone()));
    }

    let trial = binds.insert(v.name.clone(), subject.clone());
    let (rewritten_guard, _) = host.rewrite(&v.guard, &trial);
    match rewritten_guard.kind() {
        AtomKind::Literal(Literal::Bool(true)) => Outcome::Match(trial),
        _ => Outcome::Fail(MatchFailure::new("guard did not reduce to true", pattern, subject)),
    }
}

fn match_apply(
    p: &crate::atom::ApplyData,
    pattern: &Atom,
    subject: &Atom,
    binds: &Bindings,
    host: &dyn RewriteHost,
) -> Outcome {
    let s = match subject.kind() {
        AtomKind::Apply(s) => s,
        _ => return Outcome::Fail(MatchFailure::new("subject is not an Apply", pattern, subject)),
    };
    match match_atoms(&p.op, &s.op, binds, host, None) {
        Outcome::Fail(f) => Outcome::Fail(MatchFailure::because("head mismatch", pattern, subject, f)),
        Outcome::Match(b2) => match_atoms(&p.arg, &s.arg, &b2, host, Some(&p.op)),
        Outcome::Many(many) => {
            let mut out = Vec::new();
            for b2 in many {
                out.extend(match_atoms(&p.arg, &s.arg, &b2, host, Some(&p.op)).into_bindings_vec());
            }
            if out.is_empty() {
                Outcome::Fail(MatchFailure::new("no argument binding succeeded", pattern, subject))
            } else {
                Outcome::Many(out)
            }
        }
    }
}

fn match_lambda(
    p: &crate::atom::LambdaData,
    pattern: &Atom,
    subject: &Atom,
    binds: &Bindings,
    host: &dyn RewriteHost,
) -> Outcome {
    let s = match subject.kind() {
        AtomKind::Lambda(s) => s,
        _ => return Outcome::Fail(MatchFailure::new("subject is not a Lambda", pattern, subject)),
    };
    if pattern == subject {
        return Outcome::Match(binds.clone());
    }
    // Alpha-rename the subject's bound variable to the pattern's before
    // comparing bodies, so the match is insensitive to the literal name
    // the subject's binder happens to use.
    let renamed_subject_body = crate::atom::rename_in_lambda_body(&s.var_name, &p.var_name, &s.body);
    match_atoms(&p.body, &renamed_subject_body, binds, host, None)
}

fn match_atom_seq(
    p: &crate::atom::SeqData,
    pattern: &Atom,
    subject: &Atom,
    binds: &Bindings,
    host: &dyn RewriteHost,
) -> Outcome {
    let s = match subject.kind() {
        AtomKind::AtomSeq(s) => s,
        _ => return Outcome::Fail(MatchFailure::new("subject is not an AtomSeq", pattern, subject)),
    };

    let props_binds = match_props(&p.props, &s.props, binds, host);
    let props_binds = match props_binds {
        Outcome::Fail(f) => return Outcome::Fail(MatchFailure::because("property mismatch", pattern, subject, f)),
        other => other,
    };

    let flags = match p.props.effective_flags() {
        Some(f) => f,
        None => return Outcome::Fail(MatchFailure::new("pattern properties unresolved", pattern, subject)),
    };

    let candidates = props_binds.into_bindings_vec();
    let mut results = Vec::new();
    for b in candidates {
        let outcome = if flags.associative && flags.commutative {
            match_ac(&p.items, &s.items, &p.props, &b, host, pattern, subject)
        } else if flags.associative {
            match_a(&p.items, &s.items, &p.props, &b, host, pattern, subject)
        } else if flags.commutative {
            match_c(&p.items, &s.items, &b, host, pattern, subject)
        } else {
            match_plain(&p.items, &s.items, &b, host, pattern, subject)
        };
        results.extend(outcome.into_bindings_vec());
    }

    if results.is_empty() {
        Outcome::Fail(MatchFailure::new("no element arrangement matched", pattern, subject))
    } else if results.len() == 1 {
        Outcome::Match(results.into_iter().next().unwrap())
    } else {
        Outcome::Many(results)
    }
}

fn match_props(p: &crate::algprop::AlgProp, s: &crate::algprop::AlgProp, binds: &Bindings, host: &dyn RewriteHost) -> Outcome {
    let pairs = [
        (&p.associative, &s.associative),
        (&p.commutative, &s.commutative),
        (&p.idempotent, &s.idempotent),
        (&p.absorber, &s.absorber),
        (&p.identity, &s.identity),
    ];
    let mut current = binds.clone();
    for (pa, sa) in pairs {
        match (pa, sa) {
            (None, _) => {}
            (Some(pa), None) => {
                return Outcome::Fail(MatchFailure::new("absent subject component", pa, pa));
            }
            (Some(pa), Some(sa)) => match match_atoms(pa, sa, &current, host, None) {
                Outcome::Match(b) => current = b,
                Outcome::Fail(f) => return Outcome::Fail(f),
                Outcome::Many(many) => current = many.into_iter().next().unwrap_or(current),
            },
        }
    }
    Outcome::Match(current)
}

fn match_plain(
    p: &ImVector<Atom>,
    s: &ImVector<Atom>,
    binds: &Bindings,
    host: &dyn RewriteHost,
    pattern: &Atom,
    subject: &Atom,
) -> Outcome {
    if p.len() != s.len() {
        return Outcome::Fail(MatchFailure::new("length mismatch", pattern, subject));
    }
    let mut frontier = vec![binds.clone()];
    for (pi, si) in p.iter().zip(s.iter()) {
        let mut next = Vec::new();
        for b in &frontier {
            next.extend(match_atoms(pi, si, b, host, None).into_bindings_vec());
        }
        frontier = next;
        if frontier.is_empty() {
            return Outcome::Fail(MatchFailure::new("positional element mismatch", pattern, subject));
        }
    }
    multiplex(frontier, pattern, subject)
}

/// §4.5.1: try every permutation of the subject against the pattern in order.
fn match_c(
    p: &ImVector<Atom>,
    s: &ImVector<Atom>,
    binds: &Bindings,
    host: &dyn RewriteHost,
    pattern: &Atom,
    subject: &Atom,
) -> Outcome {
    if p.len() != s.len() {
        return Outcome::Fail(MatchFailure::new("length mismatch", pattern, subject));
    }
    let s_vec: Vec<Atom> = s.iter().cloned().collect();
    let mut all = Vec::new();
    for perm in s_vec.iter().cloned().permutations(s_vec.len()) {
        let perm_seq: ImVector<Atom> = perm.into_iter().collect();
        all.extend(match_plain(p, &perm_seq, binds, host, pattern, subject).into_bindings_vec());
    }
    multiplex(all, pattern, subject)
}

/// §4.5.2: partition the subject into `|p|` contiguous, nonempty slices and
/// try the first partition that succeeds.
fn match_a(
    p: &ImVector<Atom>,
    s: &ImVector<Atom>,
    props: &crate::algprop::AlgProp,
    binds: &Bindings,
    host: &dyn RewriteHost,
    pattern: &Atom,
    subject: &Atom,
) -> Outcome {
    let n = p.len();
    if n == 0 || s.len() < n {
        return Outcome::Fail(MatchFailure::new("too few subject elements to partition", pattern, subject));
    }
    let s_vec: Vec<Atom> = s.iter().cloned().collect();
    let mut many = Vec::new();
    for cuts in contiguous_partitions(s_vec.len(), n) {
        let mut frontier = vec![binds.clone()];
        let mut ok = true;
        let mut start = 0usize;
        for (i, &len) in cuts.iter().enumerate() {
            let slice: Vec<Atom> = s_vec[start..start + len].to_vec();
            start += len;
            let slice_atom = if len == 1 {
                slice.into_iter().next().unwrap()
            } else {
                sequence::construct(props.clone(), slice, p[i].type_of())
            };
            let mut next = Vec::new();
            for b in &frontier {
                next.extend(match_atoms(&p[i], &slice_atom, b, host, None).into_bindings_vec());
            }
            frontier = next;
            if frontier.is_empty() {
                ok = false;
                break;
            }
        }
        if ok {
            many.extend(frontier);
            break; // "succeed on the first partition that matches"
        }
    }
    multiplex(many, pattern, subject)
}

/// All ways to write `total` as an ordered sum of `parts` positive integers.
fn contiguous_partitions(total: usize, parts: usize) -> Vec<Vec<usize>> {
    if parts == 0 {
        return if total == 0 { vec![vec![]] } else { vec![] };
    }
    if parts == 1 {
        return vec![vec![total]];
    }
    let mut out = Vec::new();
    for first in 1..=(total.saturating_sub(parts - 1)) {
        for rest in contiguous_partitions(total - first, parts - 1) {
            let mut v = vec![first];
            v.extend(rest);
            out.push(v);
        }
    }
    out
}

/// §4.5.3: isolate constant patterns against the constant index, then
/// enumerate multiset partitions of the remainder assigned to the
/// remaining variable patterns.
fn match_ac(
    p: &ImVector<Atom>,
    s: &ImVector<Atom>,
    props: &crate::algprop::AlgProp,
    binds: &Bindings,
    host: &dyn RewriteHost,
    pattern: &Atom,
    subject: &Atom,
) -> Outcome {
    let index = ConstantIndex::build(s);
    let mut taken = vec![false; s.len()];
    let frontier = vec![binds.clone()];
    let mut remaining_patterns: Vec<Atom> = Vec::new();

    for pi in p.iter() {
        if pi.is_constant() {
            // The constant index gives an O(1) first guess; fall back to a
            // linear scan only when that slot is already claimed (repeated
            // constants in an idempotent-free sequence).
            let guess = index.position_of(pi).filter(|&i| !taken[i]);
            let found = guess.or_else(|| s.iter().enumerate().position(|(i, atom)| !taken[i] && atom == pi));
            match found {
                Some(i) => taken[i] = true,
                None => return Outcome::Fail(MatchFailure::new("constant pattern has no matching subject element", pattern, subject)),
            }
        } else {
            remaining_patterns.push(pi.clone());
        }
    }

    let remaining_subjects: Vec<Atom> = s
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken[*i])
        .map(|(_, a)| a.clone())
        .collect();

    if remaining_patterns.is_empty() {
        return if remaining_subjects.is_empty() {
            Outcome::Many(frontier)
        } else {
            Outcome::Fail(MatchFailure::new("leftover subject elements with no pattern to absorb them", pattern, subject))
        };
    }

    let mut many = Vec::new();
    for assignment in multiset_partitions(&remaining_subjects, remaining_patterns.len()) {
        for perm in (0..remaining_patterns.len()).permutations(remaining_patterns.len()) {
            let mut next = frontier.clone();
            let mut ok = true;
            for (pat_idx, &group_idx) in perm.iter().enumerate() {
                let group = &assignment[group_idx];
                if group.is_empty() {
                    ok = false;
                    break;
                }
                let group_atom = if group.len() == 1 {
                    group[0].clone()
                } else {
                    sequence::construct(props.clone(), group.clone(), remaining_patterns[pat_idx].type_of())
                };
                let mut stepped = Vec::new();
                for b in &next {
                    stepped.extend(match_atoms(&remaining_patterns[pat_idx], &group_atom, b, host, None).into_bindings_vec());
                }
                next = stepped;
                if next.is_empty() {
                    ok = false;
                    break;
                }
            }
            if ok {
                many.extend(next);
            }
        }
    }
    multiplex(many, pattern, subject)
}

/// All ways to partition `items` into exactly `groups` nonempty parts,
/// without regard to adjacency — unlike [`contiguous_partitions`], an AC
/// pattern variable may absorb subject elements that were never next to
/// each other in `items`. Items keep their relative order within whichever
/// group they land in.
///
/// Enumerated as every surjective assignment of item index to group index
/// (`groups.pow(items.len())` candidates, filtered down to the ones that
/// actually use every group); fine for the small subject arities this
/// engine's rule sets match against, not meant to scale past that.
fn multiset_partitions(items: &[Atom], groups: usize) -> Vec<Vec<Vec<Atom>>> {
    if groups == 0 {
        return if items.is_empty() { vec![vec![]] } else { vec![] };
    }
    let n = items.len();
    if n < groups {
        return Vec::new();
    }
    if groups == 1 {
        return vec![vec![items.to_vec()]];
    }
    let mut out = Vec::new();
    for assignment in std::iter::repeat(0..groups).take(n).multi_cartesian_product() {
        if !(0..groups).all(|g| assignment.contains(&g)) {
            continue;
        }
        let mut parts: Vec<Vec<Atom>> = vec![Vec::new(); groups];
        for (item, &group) in items.iter().zip(assignment.iter()) {
            parts[group].push(item.clone());
        }
        out.push(parts);
    }
    out
}

fn multiplex(results: Vec<Bindings>, pattern: &Atom, subject: &Atom) -> Outcome {
    match results.len() {
        0 => Outcome::Fail(MatchFailure::new("no arrangement matched", pattern, subject)),
        1 => Outcome::Match(results.into_iter().next().unwrap()),
        _ => Outcome::Many(results),
    }
}
