//! Rule library: rulesets, per-atom rule indexing, and iteration.

use std::collections::HashMap;

use crate::atom::{Atom, AtomKind, Ordinal};
use crate::bindings::Bindings;
use crate::matcher::{self, RewriteHost};

/// `(pattern, rewrite, guards, rulesetNames, synthetic?)`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Atom,
    pub rewrite: Atom,
    pub guards: Vec<Atom>,
    pub ruleset_names: Vec<String>,
    /// True for rules generated by the engine itself (e.g. by a strategy
    /// operator), rather than declared by a user — informational only.
    pub synthetic: bool,
}

impl Rule {
    pub fn new(pattern: Atom, rewrite: Atom, guards: Vec<Atom>, ruleset_names: Vec<String>) -> Self {
        Rule {
            pattern,
            rewrite,
            guards,
            ruleset_names,
            synthetic: false,
        }
    }

    /// Attempts to fire this rule against `subject`. On the first candidate
    /// binding set whose guards all reduce to literal `true`, rewrites the
    /// right-hand side and returns `(result, true)`; otherwise `None`.
    pub fn try_fire(&self, subject: &Atom, host: &dyn RewriteHost) -> Option<Atom> {
        let candidates = matcher::match_atoms(&self.pattern, subject, &Bindings::new(), host, None).into_bindings_vec();
        'candidate: for binds in candidates {
            for guard in &self.guards {
                let (rewritten_guard, _) = host.rewrite(guard, &binds);
                if !is_literal_true(&rewritten_guard) {
                    continue 'candidate;
                }
            }
            let (result, _) = host.rewrite(&self.rewrite, &binds);
            return Some(result);
        }
        None
    }
}

fn is_literal_true(atom: &Atom) -> bool {
    matches!(atom.kind(), AtomKind::Literal(crate::atom::Literal::Bool(true)))
}

/// A cheap pre-filter key over a rule's pattern head: variant, and (for an
/// Apply-of-OperatorRef pattern) the operator name. Two heads that don't
/// share a key can never match the same subject head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HeadKey {
    Variant(u8),
    Operator(String),
    Wildcard,
}

fn head_key(pattern: &Atom) -> HeadKey {
    match pattern.kind() {
        AtomKind::Variable(_) | AtomKind::MetaVariable(_) => HeadKey::Wildcard,
        AtomKind::Apply(data) => match data.op.kind() {
            AtomKind::OperatorRef(name) => HeadKey::Operator(name.clone()),
            _ => HeadKey::Variant(Ordinal::Apply as u8),
        },
        other => HeadKey::Variant(other.ordinal() as u8),
    }
}

fn subject_head_keys(subject: &Atom) -> Vec<HeadKey> {
    let mut keys = vec![HeadKey::Variant(subject.ordinal() as u8)];
    if let AtomKind::Apply(data) = subject.kind() {
        if let AtomKind::OperatorRef(name) = data.op.kind() {
            keys.push(HeadKey::Operator(name.clone()));
        }
    }
    keys
}

/// Rules grouped by ruleset name, with a head-key index for a cheap
/// pre-filter before the matcher runs — by variant, and for operator
/// applies, by operator name.
#[derive(Debug, Clone, Default)]
pub struct RuleLibrary {
    by_ruleset: HashMap<String, Vec<Rule>>,
    index: HashMap<String, HashMap<HeadKey, Vec<usize>>>,
}

impl RuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Rule) {
        let key = head_key(&rule.pattern);
        for ruleset in rule.ruleset_names.clone() {
            let rules = self.by_ruleset.entry(ruleset.clone()).or_default();
            let position = rules.len();
            rules.push(rule.clone());
            self.index
                .entry(ruleset)
                .or_default()
                .entry(key.clone())
                .or_default()
                .push(position);
        }
    }

    /// Rules from the named rulesets whose head is compatible with
    /// `subject`'s head, in declared order.
    pub fn get_rules(&self, subject: &Atom, ruleset_names: &[String]) -> Vec<&Rule> {
        let mut out: Vec<(String, usize)> = Vec::new();
        let wanted_keys = subject_head_keys(subject);
        for name in ruleset_names {
            let Some(per_head) = self.index.get(name) else {
                continue;
            };
            let mut positions: Vec<usize> = Vec::new();
            for key in wanted_keys.iter().chain(std::iter::once(&HeadKey::Wildcard)) {
                if let Some(ps) = per_head.get(key) {
                    positions.extend(ps.iter().copied());
                }
            }
            positions.sort_unstable();
            positions.dedup();
            for p in positions {
                out.push((name.clone(), p));
            }
        }
        out.into_iter()
            .filter_map(|(name, p)| self.by_ruleset.get(&name).and_then(|rules| rules.get(p)))
            .collect()
    }

    pub fn rule_count(&self, ruleset: &str) -> usize {
        self.by_ruleset.get(ruleset).map(Vec::len).unwrap_or(0)
    }

    pub fn ruleset_names(&self) -> impl Iterator<Item = &String> {
        self.by_ruleset.keys()
    }
}

/// Aggregate counters exposed for diagnostics (SPEC_FULL.md §B).
#[derive(Debug, Clone, Default)]
pub struct RuleStats {
    pub rules_tried: u64,
    pub rules_fired: u64,
}

impl RuleStats {
    pub fn record_try(&mut self) {
        self.rules_tried += 1;
    }
    pub fn record_fire(&mut self) {
        self.rules_fired += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_key_groups_operator_applies_by_name() {
        let pattern = Atom::op_apply("xx", Atom::variable("a", Atom::any(), None, false), Atom::any());
        assert_eq!(head_key(&pattern), HeadKey::Operator("xx".to_string()));
    }

    #[test]
    fn get_rules_filters_by_ruleset_and_head() {
        let mut lib = RuleLibrary::new();
        lib.add_rule(Rule::new(Atom::int(1), Atom::int(2), vec![], vec!["math".to_string()]));
        lib.add_rule(Rule::new(Atom::symbol("x"), Atom::symbol("y"), vec![], vec!["other".to_string()]));
        let found = lib.get_rules(&Atom::int(1), &["math".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rewrite, Atom::int(2));
    }
}
