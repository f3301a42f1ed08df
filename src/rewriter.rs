//! Rewriter: structural substitution, the Apply smart constructor, and the
//! cache-driven fixed-point rule application that together make up
//! `Executor::rewrite`.
//!
//! Two distinct operations share the name "rewrite" and are kept as two
//! functions here:
//!
//! - [`Executor::instantiate`] is structural substitution: replace bound
//!   variables, recurse into children, reconstruct `Apply` nodes via the
//!   smart constructor. It never touches the cache or the rule library.
//!   The matcher uses it (through [`RewriteHost`]) to evaluate guards, and
//!   the rule library uses it to instantiate a firing rule's right-hand
//!   side.
//! - [`Executor::rewrite`] is fixed-point application of rules: for a
//!   ground subject and a set of active ruleset names, consult the memo
//!   cache, try indexed rules at the current node, and otherwise descend
//!   bottom-up into children before retrying at the current node, to
//!   quiescence.
//!
//! Both paths reconstruct `Apply` nodes through the same
//! [`Executor::apply_smart`] decision table.

use std::cell::Cell;

use crate::atom::{Atom, AtomKind, Literal, SpecialFormKind};
use crate::bindings::Bindings;
use crate::cache::CacheLookup;
use crate::error::ElisionError;
use crate::executor::Executor;
use crate::matcher::RewriteHost;
use crate::operators::OperatorShape;
use crate::sequence;

thread_local! {
    /// Stands in for stack-overflow-on-unbounded-recursion detection. Rust
    /// has no catchable stack overflow, so a recursion-depth ceiling on
    /// Apply smart-constructor invocations is used instead.
    static APPLY_DEPTH: Cell<u32> = Cell::new(0);
}

/// Apply smart-constructor recursion ceiling before an "unbounded recursion"
/// error is raised instead of a hard stack overflow.
const MAX_APPLY_DEPTH: u32 = 4096;

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<DepthGuard, ()> {
        APPLY_DEPTH.with(|d| {
            let next = d.get() + 1;
            if next > MAX_APPLY_DEPTH {
                Err(())
            } else {
                d.set(next);
                Ok(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        APPLY_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// The three ways an Apply's operator position can be resolved (design note
/// §9: "Model this as a tagged variant ... selected by inspecting the head
/// variant; the Apply smart constructor becomes a small decision table, not
/// virtual dispatch").
enum AppliedDispatch {
    Applicable,
    Rewriter,
    Plain,
}

impl Executor {
    // -- Structural substitution (§4.6 first paragraph) ---------------------

    /// `rewrite(atom, binds) -> (atom', changed?)`: substitutes bound
    /// variables/metavariables, recurses structurally, and reconstructs
    /// `Apply` nodes through the smart constructor. Never consults the cache
    /// or rule library.
    pub fn instantiate(&self, atom: &Atom, binds: &Bindings) -> (Atom, bool) {
        if crate::deadline::expired() {
            return (atom.clone(), true);
        }
        match atom.kind() {
            AtomKind::Literal(_) => self.instantiate_type_only(atom, binds),
            AtomKind::Variable(v) | AtomKind::MetaVariable(v) => match binds.get(&v.name) {
                Some(bound) => (bound.clone(), true),
                None => self.instantiate_type_only(atom, binds),
            },
            AtomKind::AtomSeq(seq) => {
                let (new_props, props_changed) = self.instantiate_algprop(&seq.props, binds);
                let mut items_changed = false;
                let mut new_items = Vec::with_capacity(seq.items.len());
                for item in seq.items.iter() {
                    let (new_item, c) = self.instantiate(item, binds);
                    items_changed |= c;
                    new_items.push(new_item);
                }
                if props_changed || items_changed {
                    (sequence::construct(new_props, new_items, atom.type_of()), true)
                } else {
                    (atom.clone(), false)
                }
            }
            AtomKind::Apply(data) => {
                let (op, op_changed) = self.instantiate(&data.op, binds);
                let (arg, arg_changed) = self.instantiate(&data.arg, binds);
                let rebuilt = self.reconstruct_apply(&op, &arg);
                let changed = op_changed || arg_changed || !crate::atom::atoms_equal(&rebuilt, atom);
                (rebuilt, changed)
            }
            AtomKind::Lambda(data) => {
                let (var_type, ty_changed) = self.instantiate(&data.var_type, binds);
                let inner_binds = binds.remove(&data.var_name);
                let (body, body_changed) = self.instantiate(&data.body, &inner_binds);
                if ty_changed || body_changed {
                    (Atom::lambda(data.var_name.clone(), var_type, body), true)
                } else {
                    (atom.clone(), false)
                }
            }
            AtomKind::MapPair(l, r) => {
                let (nl, cl) = self.instantiate(l, binds);
                let (nr, cr) = self.instantiate(r, binds);
                if cl || cr {
                    (Atom::map_pair(nl, nr), true)
                } else {
                    (atom.clone(), false)
                }
            }
            AtomKind::MatchAtom(data) => {
                let (pr, c0) = self.instantiate(&data.pattern_rewrite, binds);
                let mut changed = c0;
                let mut guards = Vec::with_capacity(data.guards.len());
                for g in data.guards.iter() {
                    let (ng, c) = self.instantiate(g, binds);
                    changed |= c;
                    guards.push(ng);
                }
                if changed {
                    (Atom::match_atom(pr, guards), true)
                } else {
                    (atom.clone(), false)
                }
            }
            AtomKind::SpecialForm(data) => self.instantiate_special_form(atom, &data.kind, binds),
            AtomKind::BindingsAtom(map) => {
                let mut changed = false;
                let mut rebuilt = Bindings::new();
                for (name, value) in map.iter() {
                    let (nv, c) = self.instantiate(value, binds);
                    changed |= c;
                    rebuilt = rebuilt.insert(name.clone(), nv);
                }
                if changed {
                    (Atom::bindings_atom(rebuilt), true)
                } else {
                    (atom.clone(), false)
                }
            }
            AtomKind::AlgProp(_) | AtomKind::RulesetRef(_) | AtomKind::OperatorRef(_) | AtomKind::NamedRootType(_) => {
                self.instantiate_type_only(atom, binds)
            }
        }
    }

    fn instantiate_type_only(&self, atom: &Atom, binds: &Bindings) -> (Atom, bool) {
        let ty = atom.type_of();
        if ty.ptr_eq(atom) {
            // The Type Universe: self-typed, recursing would never terminate.
            return (atom.clone(), false);
        }
        let (new_ty, changed) = self.instantiate(&ty, binds);
        if changed {
            (atom.with_type(new_ty), true)
        } else {
            (atom.clone(), false)
        }
    }

    fn instantiate_algprop(&self, props: &crate::algprop::AlgProp, binds: &Bindings) -> (crate::algprop::AlgProp, bool) {
        let mut changed = false;
        let mut instantiate_opt = |opt: &Option<Atom>| -> Option<Atom> {
            opt.as_ref().map(|a| {
                let (na, c) = self.instantiate(a, binds);
                changed |= c;
                na
            })
        };
        let associative = instantiate_opt(&props.associative);
        let commutative = instantiate_opt(&props.commutative);
        let idempotent = instantiate_opt(&props.idempotent);
        let absorber = instantiate_opt(&props.absorber);
        let identity = instantiate_opt(&props.identity);
        (
            crate::algprop::AlgProp {
                associative,
                commutative,
                idempotent,
                absorber,
                identity,
            },
            changed,
        )
    }

    fn instantiate_special_form(&self, atom: &Atom, kind: &SpecialFormKind, binds: &Bindings) -> (Atom, bool) {
        match kind {
            // A quoted atom is inert: rewriting must not look inside it.
            SpecialFormKind::Quote(_) => (atom.clone(), false),
            SpecialFormKind::If { cond, then, alt } => {
                let (c, cc) = self.instantiate(cond, binds);
                let (t, tc) = self.instantiate(then, binds);
                let (a, ac) = self.instantiate(alt, binds);
                if cc || tc || ac {
                    (
                        Atom::special_form(SpecialFormKind::If { cond: c, then: t, alt: a }),
                        true,
                    )
                } else {
                    (atom.clone(), false)
                }
            }
            SpecialFormKind::Let { name, value, body } => {
                let (v, vc) = self.instantiate(value, binds);
                let inner_binds = binds.remove(name);
                let (b, bc) = self.instantiate(body, &inner_binds);
                if vc || bc {
                    (
                        Atom::special_form(SpecialFormKind::Let {
                            name: name.clone(),
                            value: v,
                            body: b,
                        }),
                        true,
                    )
                } else {
                    (atom.clone(), false)
                }
            }
            SpecialFormKind::Sequence(items) => {
                let mut changed = false;
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    let (ni, c) = self.instantiate(item, binds);
                    changed |= c;
                    out.push(ni);
                }
                if changed {
                    (Atom::special_form(SpecialFormKind::Sequence(out.into_iter().collect())), true)
                } else {
                    (atom.clone(), false)
                }
            }
        }
    }

    fn reconstruct_apply(&self, op: &Atom, arg: &Atom) -> Atom {
        match self.apply_smart(op, arg, false) {
            Ok(result) => result,
            Err(_) => Atom::simple_apply(op.clone(), arg.clone(), Atom::any()),
        }
    }

    // -- Apply smart constructor (§4.6) --------------------------------------

    /// `(op, arg, bypass?) -> atom'`. `bypass = true` lets a native handler
    /// recursively reconstruct an Apply of its own operator without
    /// re-entering its own handler.
    pub fn apply_smart(&self, op: &Atom, arg: &Atom, bypass: bool) -> Result<Atom, ElisionError> {
        let _guard = DepthGuard::enter().map_err(|_| ElisionError::UnboundedRecursion {
            operator: describe(op),
            argument: describe(arg),
        })?;

        // Step 1: a meta-term argument blocks evaluation unless the operator
        // opted in via `even_meta`.
        if !arg.is_term() && !self.op_even_meta(op) {
            return Ok(Atom::simple_apply(op.clone(), arg.clone(), Atom::any()));
        }

        // Step 2: string ++ string concatenates eagerly.
        if let (AtomKind::Literal(Literal::String(a)), AtomKind::Literal(Literal::String(b))) = (op.kind(), arg.kind()) {
            let concatenated = Atom::string_with_type(format!("{a}{b}"), op.type_of());
            self.trace.emit(crate::trace::TraceEvent::NodeCreated {
                printed: crate::print::to_parse_string(&concatenated),
            });
            return Ok(concatenated);
        }

        let result = match self.dispatch_kind(op)? {
            AppliedDispatch::Applicable if !bypass => self.invoke_applicable_checked(op, arg)?,
            AppliedDispatch::Rewriter if !bypass => self.wrap_rewriter_result(op, arg),
            _ => Atom::simple_apply(op.clone(), arg.clone(), Atom::any()),
        };
        self.trace.emit(crate::trace::TraceEvent::NodeCreated {
            printed: crate::print::to_parse_string(&result),
        });
        Ok(result)
    }

    fn op_even_meta(&self, op: &Atom) -> bool {
        match op.kind() {
            AtomKind::OperatorRef(name) => self.operators.borrow().get(name).map(|o| o.even_meta).unwrap_or(false),
            _ => false,
        }
    }

    fn dispatch_kind(&self, op: &Atom) -> Result<AppliedDispatch, ElisionError> {
        match op.kind() {
            AtomKind::OperatorRef(name) => {
                let operators = self.operators.borrow();
                let operator = operators.get(name).ok_or_else(|| ElisionError::UnknownOperator { name: name.clone() })?;
                if operator.is_applicable() {
                    Ok(AppliedDispatch::Applicable)
                } else if operator.is_rewriter() {
                    Ok(AppliedDispatch::Rewriter)
                } else {
                    Ok(AppliedDispatch::Plain)
                }
            }
            AtomKind::RulesetRef(_) | AtomKind::MatchAtom(_) => Ok(AppliedDispatch::Rewriter),
            AtomKind::SpecialForm(data) if matches!(data.kind, SpecialFormKind::Sequence(_)) => Ok(AppliedDispatch::Rewriter),
            _ => Ok(AppliedDispatch::Plain),
        }
    }

    fn invoke_applicable_checked(&self, op: &Atom, arg: &Atom) -> Result<Atom, ElisionError> {
        let AtomKind::OperatorRef(name) = op.kind() else {
            return Ok(Atom::simple_apply(op.clone(), arg.clone(), Atom::any()));
        };
        let operator = {
            let operators = self.operators.borrow();
            operators.get(name).cloned()
        };
        let Some(operator) = operator else {
            return Err(ElisionError::UnknownOperator { name: name.clone() });
        };
        let OperatorShape::SymbolicOperator { params, .. } = &operator.shape else {
            return Err(ElisionError::internal(format!("operator '{name}' is not a SymbolicOperator")));
        };
        let bindings = bind_params(params, arg);
        operator.apply(arg, bindings)
    }

    /// §4.6 step 4: wraps `doRewrite(op, arg)`'s result as a BindingsAtom
    /// with keys `"atom"` and `"flag"`.
    fn wrap_rewriter_result(&self, op: &Atom, arg: &Atom) -> Atom {
        let (result, fired) = self.do_rewrite(op, arg);
        let bindings = Bindings::new().insert("atom", result).insert("flag", Atom::bool(fired));
        Atom::bindings_atom(bindings)
    }

    /// `doRewrite(atom, hint?) -> (atom', fired?)`: the uniform operation a
    /// ruleset, a single rule, an operator's case list, or a sequence
    /// strategy all expose when used as an Apply's operator.
    pub fn do_rewrite(&self, rewriter: &Atom, subject: &Atom) -> (Atom, bool) {
        match rewriter.kind() {
            AtomKind::RulesetRef(name) => {
                let (result, fired) = self.rewrite(subject, std::slice::from_ref(name));
                (result, fired)
            }
            AtomKind::MatchAtom(data) => {
                let rule = crate::rules::Rule::new(
                    data.pattern_rewrite.kind_as_pattern(),
                    data.pattern_rewrite.kind_as_rewrite(),
                    data.guards.iter().cloned().collect(),
                    vec![],
                );
                match rule.try_fire(subject, self) {
                    Some(result) => (result, true),
                    None => (subject.clone(), false),
                }
            }
            AtomKind::OperatorRef(name) => {
                let cases = {
                    let operators = self.operators.borrow();
                    match operators.get(name) {
                        Some(crate::operators::Operator {
                            shape: OperatorShape::CaseOperator { cases },
                            ..
                        }) => cases.clone(),
                        _ => return (subject.clone(), false),
                    }
                };
                for case in &cases {
                    if let Some(result) = case.try_fire(subject, self) {
                        return (result, true);
                    }
                }
                (subject.clone(), false)
            }
            AtomKind::SpecialForm(data) => match &data.kind {
                SpecialFormKind::Sequence(strategies) => {
                    for strategy in strategies.iter() {
                        let (result, fired) = self.do_rewrite(strategy, subject);
                        if fired {
                            return (result, true);
                        }
                    }
                    (subject.clone(), false)
                }
                _ => (subject.clone(), false),
            },
            _ => (subject.clone(), false),
        }
    }

    // -- Fixed-point rule application (§4.6 closing paragraphs, C8) ---------

    /// The top-level entry point: rewrites `subject` to a fixed point under
    /// the named rulesets, consulting and populating the memo cache (C8) at
    /// every node.
    pub fn rewrite(&self, subject: &Atom, ruleset_names: &[String]) -> (Atom, bool) {
        let _session = crate::deadline::enter_session(self.config().rewrite_timeout_secs);

        if crate::deadline::expired() {
            log::warn!("rewrite session timed out, returning partial result for ruleset(s) {ruleset_names:?}");
            return (subject.clone(), true);
        }

        let cache_enabled = self.config().cache;
        let max_depth = self.config().max_cache_depth;
        let within_depth_bound = max_depth < 0 || (subject.depth() as i64) <= max_depth;
        let bitset = self.ruleset_bitset(ruleset_names);

        if cache_enabled && within_depth_bound {
            match self.cache.borrow().get(subject, bitset) {
                CacheLookup::Trivial(a) => return (a, false),
                CacheLookup::KnownNormal => return (subject.clone(), false),
                CacheLookup::Hit(a) => return (a, true),
                CacheLookup::Miss => {}
            }
        }

        let (result, changed) = self.rewrite_uncached(subject, ruleset_names);

        if cache_enabled && within_depth_bound {
            self.cache.borrow().put(subject, bitset, &result, subject.depth());
        }
        (result, changed)
    }

    fn rewrite_uncached(&self, subject: &Atom, ruleset_names: &[String]) -> (Atom, bool) {
        self.trace.emit(crate::trace::TraceEvent::Push {
            subject: crate::print::to_parse_string(subject),
        });
        let outcome = self.rewrite_uncached_inner(subject, ruleset_names);
        self.trace.emit(crate::trace::TraceEvent::Pop);
        outcome
    }

    fn rewrite_uncached_inner(&self, subject: &Atom, ruleset_names: &[String]) -> (Atom, bool) {
        if let Some(fired) = self.try_rules_once(subject, ruleset_names) {
            let (normalized, _) = self.rewrite(&fired, ruleset_names);
            return (normalized, true);
        }

        let (rebuilt, children_changed) = self.rewrite_children(subject, ruleset_names);
        if children_changed {
            if let Some(fired) = self.try_rules_once(&rebuilt, ruleset_names) {
                let (normalized, _) = self.rewrite(&fired, ruleset_names);
                return (normalized, true);
            }
            return (rebuilt, true);
        }

        (subject.clone(), false)
    }

    /// Tries every rule indexed under `ruleset_names` whose head is
    /// compatible with `subject`, in declared order; returns the first
    /// firing's result.
    fn try_rules_once(&self, subject: &Atom, ruleset_names: &[String]) -> Option<Atom> {
        if ruleset_names.is_empty() {
            return None;
        }
        let rules_guard = self.rules.borrow();
        let rules = rules_guard.get_rules(subject, ruleset_names);
        for rule in rules {
            self.rule_stats.borrow_mut().record_try();
            if let Some(result) = rule.try_fire(subject, self) {
                self.rule_stats.borrow_mut().record_fire();
                log::debug!("rule fired in ruleset(s) {ruleset_names:?}: {:#x} -> {:#x}", subject.hash_value(), result.hash_value());
                self.trace.emit(crate::trace::TraceEvent::RewriteStep {
                    rule: ruleset_names.join(","),
                    from: crate::print::to_parse_string(subject),
                    to: crate::print::to_parse_string(&result),
                });
                return Some(result);
            }
        }
        None
    }

    /// Descends into `subject`'s children, normalizing each bottom-up under
    /// `ruleset_names`, and rebuilds the parent (via the smart constructor
    /// for `Apply`, via plain reconstruction otherwise).
    fn rewrite_children(&self, subject: &Atom, ruleset_names: &[String]) -> (Atom, bool) {
        match subject.kind() {
            AtomKind::Apply(data) => {
                let (op, c1) = self.rewrite(&data.op, ruleset_names);
                let (arg, c2) = self.rewrite(&data.arg, ruleset_names);
                if !c1 && !c2 {
                    return (subject.clone(), false);
                }
                (self.reconstruct_apply(&op, &arg), true)
            }
            AtomKind::AtomSeq(seq) => {
                let mut changed = false;
                let mut items = Vec::with_capacity(seq.items.len());
                for item in seq.items.iter() {
                    let (ni, c) = self.rewrite(item, ruleset_names);
                    changed |= c;
                    items.push(ni);
                }
                if !changed {
                    return (subject.clone(), false);
                }
                (sequence::construct(seq.props.clone(), items, subject.type_of()), true)
            }
            AtomKind::Lambda(data) => {
                let (body, changed) = self.rewrite(&data.body, ruleset_names);
                if !changed {
                    return (subject.clone(), false);
                }
                (Atom::lambda(data.var_name.clone(), data.var_type.clone(), body), true)
            }
            AtomKind::MapPair(l, r) => {
                let (nl, c1) = self.rewrite(l, ruleset_names);
                let (nr, c2) = self.rewrite(r, ruleset_names);
                if !c1 && !c2 {
                    return (subject.clone(), false);
                }
                (Atom::map_pair(nl, nr), true)
            }
            AtomKind::MatchAtom(data) => {
                let (pr, c0) = self.rewrite(&data.pattern_rewrite, ruleset_names);
                let mut changed = c0;
                let mut guards = Vec::with_capacity(data.guards.len());
                for g in data.guards.iter() {
                    let (ng, c) = self.rewrite(g, ruleset_names);
                    changed |= c;
                    guards.push(ng);
                }
                if !changed {
                    return (subject.clone(), false);
                }
                (Atom::match_atom(pr, guards), true)
            }
            // Literals, variables, and leaf references have no rewritable
            // children under a ruleset (types are not themselves rewritten
            // by the fixed-point driver, which only concerns ground terms).
            _ => (subject.clone(), false),
        }
    }
}

fn bind_params(params: &[crate::operators::Parameter], arg: &Atom) -> Bindings {
    let mut bindings = Bindings::new();
    if params.len() == 1 {
        bindings = bindings.insert(params[0].name.clone(), arg.clone());
        return bindings;
    }
    if let AtomKind::AtomSeq(seq) = arg.kind() {
        for (param, value) in params.iter().zip(seq.items.iter()) {
            bindings = bindings.insert(param.name.clone(), value.clone());
        }
    }
    bindings
}

fn describe(atom: &Atom) -> String {
    format!("{:?}#{:x}", atom.ordinal() as u8, atom.hash_value())
}

impl RewriteHost for Executor {
    fn rewrite(&self, atom: &Atom, binds: &Bindings) -> (Atom, bool) {
        self.instantiate(atom, binds)
    }

    fn is_rewriter(&self, atom: &Atom) -> bool {
        matches!(self.dispatch_kind(atom), Ok(AppliedDispatch::Rewriter))
    }

    fn is_applicable(&self, atom: &Atom) -> bool {
        matches!(self.dispatch_kind(atom), Ok(AppliedDispatch::Applicable))
    }

    fn invoke_rewriter(&self, rewriter: &Atom, subject: &Atom) -> Option<Atom> {
        let (result, fired) = self.do_rewrite(rewriter, subject);
        fired.then_some(result)
    }

    fn invoke_applicable(&self, applicable: &Atom, arg: &Atom) -> Atom {
        self.invoke_applicable_checked(applicable, arg)
            .unwrap_or_else(|_| Atom::simple_apply(applicable.clone(), arg.clone(), Atom::any()))
    }

    fn fast_eq(&self, a: &Atom, b: &Atom) -> bool {
        let config = self.config();
        crate::atom::fast_eq(a, b, config.risky_equality_check, config.custom_equality_check)
    }
}

/// Used only by [`Executor::do_rewrite`]'s `MatchAtom` arm: a rule atom's
/// `pattern_rewrite` field is itself a `MapPair(pattern, rewrite)`.
impl Atom {
    fn kind_as_pattern(&self) -> Atom {
        match self.kind() {
            AtomKind::MapPair(l, _) => l.clone(),
            _ => self.clone(),
        }
    }

    fn kind_as_rewrite(&self) -> Atom {
        match self.kind() {
            AtomKind::MapPair(_, r) => r.clone(),
            _ => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algprop::AlgProp;
    use crate::operators::{Operator, OperatorShape, Parameter};
    use crate::rules::Rule;

    #[test]
    fn string_concat_under_apply() {
        let exec = Executor::new();
        let op = Atom::string("foo");
        let arg = Atom::string("bar");
        let result = exec.apply_smart(&op, &arg, false).unwrap();
        match result.kind() {
            AtomKind::Literal(Literal::String(s)) => assert_eq!(s, "foobar"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let exec = Executor::new();
        let op = Atom::operator_ref("DOES_NOT_EXIST");
        let arg = Atom::int(1);
        assert!(exec.apply_smart(&op, &arg, false).is_err());
    }

    #[test]
    fn meta_term_argument_blocks_applicable_invocation() {
        let exec = Executor::new();
        exec.register_operator(Operator::new(
            "double",
            OperatorShape::SymbolicOperator {
                params: vec![Parameter { name: "x".to_string(), ty: Atom::any() }],
                return_type: Atom::any(),
                handler: Some(std::rc::Rc::new(|data| match data.argument.kind() {
                    AtomKind::Literal(Literal::Integer(n)) => Ok(Atom::bigint(n + n)),
                    _ => Err(ElisionError::internal("expected integer")),
                })),
            },
        ))
        .unwrap();
        let op = Atom::operator_ref("double");
        let meta = Atom::metavariable("m", Atom::any(), None, false);
        let result = exec.apply_smart(&op, &meta, false).unwrap();
        assert!(matches!(result.kind(), AtomKind::Apply(_)), "should stay a SimpleApply");
    }

    #[test]
    fn applicable_handler_runs_on_ground_argument() {
        let exec = Executor::new();
        exec.register_operator(Operator::new(
            "double",
            OperatorShape::SymbolicOperator {
                params: vec![Parameter { name: "x".to_string(), ty: Atom::any() }],
                return_type: Atom::any(),
                handler: Some(std::rc::Rc::new(|data| match data.argument.kind() {
                    AtomKind::Literal(Literal::Integer(n)) => Ok(Atom::bigint(n + n)),
                    _ => Err(ElisionError::internal("expected integer")),
                })),
            },
        ))
        .unwrap();
        let op = Atom::operator_ref("double");
        let result = exec.apply_smart(&op, &Atom::int(21), false).unwrap();
        assert_eq!(result, Atom::int(42));
    }

    #[test]
    fn fixed_point_rewrites_to_normal_form() {
        let exec = Executor::new();
        // zero + x -> x, for all x (a one-rule AC-free example).
        let zero = Atom::int(0);
        let x = Atom::variable("x", Atom::any(), None, false);
        let plus = Atom::operator_ref("PLUS");
        exec.register_operator(Operator::new("PLUS", OperatorShape::CaseOperator { cases: vec![] }))
            .unwrap();
        let pattern = Atom::simple_apply(
            plus.clone(),
            Atom::atom_seq(AlgProp::none(), vec![zero.clone(), x.clone()], Atom::any()),
            Atom::any(),
        );
        exec.add_rule(Rule::new(pattern, x.clone(), vec![], vec!["arith".to_string()]));

        let subject = Atom::simple_apply(
            plus,
            Atom::atom_seq(AlgProp::none(), vec![Atom::int(0), Atom::int(7)], Atom::any()),
            Atom::any(),
        );
        let (result, changed) = exec.rewrite(&subject, &["arith".to_string()]);
        assert!(changed);
        assert_eq!(result, Atom::int(7));
    }

    #[test]
    fn cache_hit_skips_rule_retrial() {
        // Literal/variable subjects bypass the cache as Trivial (they are
        // never indexed), so the caching contract only applies to structured
        // subjects such as an Apply of an operator.
        let exec = Executor::new();
        exec.register_operator(Operator::new("DOUBLER", OperatorShape::CaseOperator { cases: vec![] }))
            .unwrap();
        let subject = Atom::simple_apply(Atom::operator_ref("DOUBLER"), Atom::int(5), Atom::any());
        exec.add_rule(Rule::new(subject.clone(), Atom::int(10), vec![], vec!["r".to_string()]));

        let (first, changed1) = exec.rewrite(&subject, &["r".to_string()]);
        assert!(changed1);
        assert_eq!(first, Atom::int(10));

        let before = exec.rule_stats().rules_tried;
        let (second, changed2) = exec.rewrite(&subject, &["r".to_string()]);
        assert!(changed2);
        assert_eq!(second, Atom::int(10));
        assert_eq!(exec.rule_stats().rules_tried, before, "cache hit must not retry rules");
    }

    #[test]
    fn no_variables_no_applicable_head_is_a_no_op() {
        let exec = Executor::new();
        let a = Atom::int(5);
        let (result, changed) = exec.instantiate(&a, &Bindings::new());
        assert!(!changed);
        assert_eq!(result, a);
    }
}
