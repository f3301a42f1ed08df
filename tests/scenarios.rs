//! End-to-end scenarios exercising full rewrite sessions (SPEC_FULL.md §A.4),
//! one per numbered scenario in the engine's testable-properties section.

use elision::algprop::AlgProp;
use elision::atom::{Atom, AtomKind};
use elision::executor::Executor;
use elision::rules::Rule;

#[test]
fn string_concat_under_apply() {
    let exec = Executor::new();
    let op = Atom::string("foo");
    let arg = Atom::string("bar");
    let result = exec.apply_smart(&op, &arg, false).expect("string concat never fails");
    assert_eq!(result, Atom::string("foobar"));
}

#[test]
fn identity_elision() {
    let props = AlgProp::new(true, false, false, None, Some(Atom::int(0)));
    let x = Atom::symbol("x");
    let y = Atom::symbol("y");
    let xs = elision::sequence::normalize(&props, vec![x.clone(), Atom::int(0), y.clone(), Atom::int(0)]).unwrap();
    let expected = elision::sequence::normalize(&props, vec![x, y]).unwrap();
    assert_eq!(xs, expected);
}

#[test]
fn absorber_capture() {
    let bottom = Atom::symbol("bottom");
    let props = AlgProp::new(true, false, false, Some(bottom.clone()), None);
    let a = Atom::symbol("a");
    let b = Atom::symbol("b");
    let xs = elision::sequence::normalize(&props, vec![a, bottom.clone(), b]).unwrap();
    assert_eq!(xs.len(), 1);
    assert_eq!(xs[0], bottom);
}

#[test]
fn ac_permutation_match_yields_six_bindings() {
    let exec = Executor::new();
    let props = AlgProp::new(true, true, false, None, None);
    let x = Atom::variable("x", Atom::any(), None, false);
    let y = Atom::variable("y", Atom::any(), None, false);
    let z = Atom::variable("z", Atom::any(), None, false);
    let pattern = Atom::atom_seq(props.clone(), vec![x, y, z], Atom::any());
    let subject = Atom::atom_seq(props, vec![Atom::int(3), Atom::int(1), Atom::int(2)], Atom::any());

    let outcome = elision::matcher::match_atoms(&pattern, &subject, &elision::bindings::Bindings::new(), &exec, None);
    let bindings = outcome.into_bindings_vec();
    assert_eq!(bindings.len(), 6, "three distinct variables over three distinct elements: 3! bindings");
}

#[test]
fn ac_match_groups_non_adjacent_subject_elements() {
    let exec = Executor::new();
    let props = AlgProp::new(true, true, false, None, None);
    let x = Atom::variable("x", Atom::any(), None, false);
    let y = Atom::variable("y", Atom::any(), None, false);
    let pattern = Atom::atom_seq(props.clone(), vec![x, y], Atom::any());

    let a = Atom::symbol("a");
    let b = Atom::symbol("b");
    let c = Atom::symbol("c");
    let subject = Atom::atom_seq(props, vec![a.clone(), b.clone(), c.clone()], Atom::any());

    let outcome = elision::matcher::match_atoms(&pattern, &subject, &elision::bindings::Bindings::new(), &exec, None);
    let bindings = outcome.into_bindings_vec();

    let items_of = |atom: &Atom| -> Vec<Atom> {
        match atom.kind() {
            AtomKind::AtomSeq(d) => d.items.iter().cloned().collect(),
            _ => vec![atom.clone()],
        }
    };
    let found_split = bindings.iter().any(|b| {
        let xv = items_of(b.get("x").unwrap());
        let yv = items_of(b.get("y").unwrap());
        let grouped_ac = xv.len() == 2 && xv.contains(&a) && xv.contains(&c) && yv == vec![b.clone()];
        let grouped_ca = yv.len() == 2 && yv.contains(&a) && yv.contains(&c) && xv == vec![b.clone()];
        grouped_ac || grouped_ca
    });
    assert!(found_split, "a non-adjacent subset {{a, c}} must be a valid AC grouping for one pattern variable");
}

#[test]
fn by_name_variable_matches_only_same_named_variable() {
    let exec = Executor::new();
    let pattern = Atom::variable("FOO", Atom::any(), None, true);
    let same_name = Atom::variable("FOO", Atom::any(), None, false);
    let different = Atom::int(17);

    let ok = elision::matcher::match_atoms(&pattern, &same_name, &elision::bindings::Bindings::new(), &exec, None);
    assert!(ok.is_success());

    let fail = elision::matcher::match_atoms(&pattern, &different, &elision::bindings::Bindings::new(), &exec, None);
    assert!(!fail.is_success());
}

#[test]
fn cache_hit_short_circuits_rules() {
    let exec = Executor::new();
    exec.register_operator(elision::operators::Operator::new(
        "WIDGET",
        elision::operators::OperatorShape::CaseOperator { cases: vec![] },
    ))
    .unwrap();
    let subject = Atom::simple_apply(Atom::operator_ref("WIDGET"), Atom::int(1), Atom::any());
    exec.add_rule(Rule::new(subject.clone(), Atom::int(2), vec![], vec!["r".to_string()]));

    let (first, _) = exec.rewrite(&subject, &["r".to_string()]);
    assert_eq!(first, Atom::int(2));
    let stats_before = exec.rule_stats();
    let misses_before = exec.cache_stats().misses;

    let (second, _) = exec.rewrite(&subject, &["r".to_string()]);
    assert_eq!(second, Atom::int(2));
    assert_eq!(exec.rule_stats().rules_tried, stats_before.rules_tried);
    assert_eq!(exec.cache_stats().misses, misses_before, "a hit must not also count as a miss");
}

#[test]
fn ground_term_with_no_rules_is_already_normal() {
    // A variable-free, non-applicable atom rewrites to itself unchanged.
    let exec = Executor::new();
    let a = Atom::simple_apply(Atom::symbol("f"), Atom::int(1), Atom::any());
    let (result, changed) = exec.rewrite(&a, &[]);
    assert!(!changed);
    assert_eq!(result, a);
}

#[test]
fn match_of_ground_pattern_against_itself_binds_nothing() {
    // A variable-free pattern matches only a structurally identical subject,
    // and binds nothing when it does.
    let exec = Executor::new();
    let p = Atom::simple_apply(Atom::symbol("f"), Atom::int(1), Atom::any());
    let s = p.clone();
    let outcome = elision::matcher::match_atoms(&p, &s, &elision::bindings::Bindings::new(), &exec, None);
    match outcome {
        elision::matcher::Outcome::Match(b) => assert!(b.is_empty()),
        other => panic!("expected a binding-free Match, got {other:?}"),
    }

    let different = Atom::simple_apply(Atom::symbol("f"), Atom::int(2), Atom::any());
    let outcome = elision::matcher::match_atoms(&p, &different, &elision::bindings::Bindings::new(), &exec, None);
    assert!(!outcome.is_success());
}

#[test]
fn aci_sequence_input_order_does_not_affect_result() {
    // For associative-commutative-idempotent sequences, input order of
    // elements does not affect the normalized result.
    let props = AlgProp::new(true, true, true, None, None);
    let a = elision::sequence::construct(props.clone(), vec![Atom::int(1), Atom::int(2), Atom::int(1)], Atom::any());
    let b = elision::sequence::construct(props, vec![Atom::int(2), Atom::int(1), Atom::int(1)], Atom::any());
    assert_eq!(a, b);
}

#[test]
fn caching_does_not_change_the_rewritten_value() {
    // Disabling the cache must not change what a subject rewrites to, only
    // whether the work is remembered.
    let with_cache = Executor::new();
    let without_cache = Executor::with_config(elision::config::Config::default().with_cache(false));
    for exec in [&with_cache, &without_cache] {
        exec.register_operator(elision::operators::Operator::new(
            "INC",
            elision::operators::OperatorShape::CaseOperator { cases: vec![] },
        ))
        .unwrap();
        exec.add_rule(Rule::new(
            Atom::simple_apply(Atom::operator_ref("INC"), Atom::int(1), Atom::any()),
            Atom::int(2),
            vec![],
            vec!["r".to_string()],
        ));
    }
    let subject = Atom::simple_apply(Atom::operator_ref("INC"), Atom::int(1), Atom::any());
    let (r1, _) = with_cache.rewrite(&subject, &["r".to_string()]);
    let (r2, _) = without_cache.rewrite(&subject, &["r".to_string()]);
    assert_eq!(r1, r2);
}

#[test]
fn type_universe_is_self_typed_and_does_not_recurse() {
    let universe = Atom::type_universe();
    assert!(matches!(universe.kind(), AtomKind::NamedRootType(name) if name == "Type"));
    assert_eq!(universe.type_of(), universe);
}
