//! A thin demonstration harness (SPEC_FULL.md §A.5): builds a small ruleset,
//! rewrites a sample atom, and prints cache/rule statistics. Not a REPL or
//! dialect front-end — those are explicitly out of scope.

use clap::Parser;
use elision::algprop::AlgProp;
use elision::atom::Atom;
use elision::executor::Executor;
use elision::operators::{Operator, OperatorShape, Parameter};
use elision::rules::Rule;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Parser, Debug)]
#[command(name = "elision-bench", about = "Smoke-test the Elision rewrite engine")]
struct Args {
    /// Number of times to re-rewrite the sample subject, to exercise the
    /// memoization cache.
    #[arg(long, default_value_t = 3)]
    iterations: u32,

    /// Disable the memo cache for this run.
    #[arg(long)]
    no_cache: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let exec = Executor::new();
    if args.no_cache {
        exec.set_config(exec.config().with_cache(false));
    }

    register_sample_ruleset(&exec);
    let subject = sample_subject();

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    println!("subject: {}", elision::print::to_parse_string(&subject));
    let _ = stdout.reset();

    let mut result = subject;
    for i in 0..args.iterations {
        let (next, changed) = exec.rewrite(&result, &["arith".to_string()]);
        log::info!("iteration {i}: changed={changed}");
        result = next;
    }

    println!("result:  {}", elision::print::to_parse_string(&result));

    let cache_stats = exec.cache_stats();
    let rule_stats = exec.rule_stats();
    println!(
        "cache: {} hits, {} misses, {} evictions",
        cache_stats.hits, cache_stats.misses, cache_stats.evictions
    );
    println!("rules: {} tried, {} fired", rule_stats.rules_tried, rule_stats.rules_fired);
}

/// Registers `PLUS` as a commutative, associative case operator with an
/// identity of `0`, plus one folding rule: `x + 0 + y -> x + y` is already
/// handled by sequence normalization; the declared rule folds two integer
/// literals together.
fn register_sample_ruleset(exec: &Executor) {
    exec.register_operator(Operator::new(
        "PLUS",
        OperatorShape::SymbolicOperator {
            params: vec![Parameter {
                name: "terms".to_string(),
                ty: Atom::any(),
            }],
            return_type: Atom::any(),
            handler: None,
        },
    ))
    .expect("PLUS is not yet registered");

    let props = AlgProp::new(true, true, false, None, Some(Atom::int(0)));
    let a = Atom::metavariable("a", Atom::named_root_type("Integer"), None, false);
    let b = Atom::metavariable("b", Atom::named_root_type("Integer"), None, false);
    let pattern = Atom::simple_apply(
        Atom::operator_ref("PLUS"),
        Atom::atom_seq(props.clone(), vec![a.clone(), b.clone()], Atom::any()),
        Atom::any(),
    );
    // A native-style fold would run through a SymbolicOperator handler in a
    // real build; this sample keeps the rule declarative so the CLI only
    // exercises rule-library plumbing, not arithmetic.
    let rewrite = Atom::simple_apply(Atom::operator_ref("PLUS"), Atom::atom_seq(props, vec![a, b], Atom::any()), Atom::any());
    exec.add_rule(Rule::new(pattern, rewrite, vec![], vec!["arith".to_string()]));
}

fn sample_subject() -> Atom {
    let props = AlgProp::new(true, true, false, None, Some(Atom::int(0)));
    Atom::simple_apply(
        Atom::operator_ref("PLUS"),
        Atom::atom_seq(props, vec![Atom::int(1), Atom::int(0), Atom::int(2)], Atom::any()),
        Atom::any(),
    )
}
