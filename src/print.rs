//! `toParseString` and the machine-readable encoding. This is the inverse
//! of the parser collaborator this engine does not implement: given an
//! atom, produce a string a parser *would* round-trip, and a structured
//! form for non-display consumers (the persistent cache file key format,
//! for one).
//!
//! No parser lives in this crate — a surface-syntax parser or dialect
//! front-end is someone else's concern — so only the printing half of
//! that round-trip is implemented here.

use crate::algprop::AlgProp;
use crate::atom::{Atom, AtomKind, FloatBase, Literal, SpecialFormKind};

/// Renders `atom` in the dialect's surface syntax.
pub fn to_parse_string(atom: &Atom) -> String {
    match atom.kind() {
        AtomKind::Literal(lit) => print_literal(lit),
        AtomKind::AlgProp(props) => print_algprop(props),
        AtomKind::Variable(v) => print_var(v, "$"),
        AtomKind::MetaVariable(v) => print_var(v, "$$"),
        AtomKind::Apply(data) => print_apply(&data.op, &data.arg),
        AtomKind::AtomSeq(seq) => print_atom_seq(&seq.props, &seq.items),
        AtomKind::BindingsAtom(bindings) => print_bindings(bindings),
        AtomKind::Lambda(data) => format!("\\{}.{}", data.var_name, to_parse_string(&data.body)),
        AtomKind::MapPair(l, r) => format!("({} -> {})", to_parse_string(l), to_parse_string(r)),
        AtomKind::MatchAtom(data) => print_match_atom(data),
        AtomKind::SpecialForm(data) => print_special_form(&data.kind),
        AtomKind::RulesetRef(name) => format!("#{name}"),
        AtomKind::OperatorRef(name) => name.clone(),
        AtomKind::NamedRootType(name) => name.clone(),
    }
}

fn print_literal(lit: &Literal) -> String {
    match lit {
        Literal::Integer(i) => i.to_string(),
        Literal::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Literal::Bool(b) => b.to_string(),
        Literal::Symbol(s) => format!("'{s}"),
        Literal::Float { significand, exponent, base } => print_float(significand, *exponent, *base),
    }
}

fn print_float(significand: &num_bigint::BigInt, exponent: i64, base: FloatBase) -> String {
    let prefix = match base {
        FloatBase::Bin => "0b",
        FloatBase::Oct => "0o",
        FloatBase::Dec => "",
        FloatBase::Hex => "0x",
    };
    format!("{prefix}{significand}e{exponent}")
}

fn print_var(v: &crate::atom::VarData, sigil: &str) -> String {
    let mut s = format!("{sigil}{}", v.name);
    if !matches!(v.guard.kind(), AtomKind::Literal(Literal::Bool(true))) {
        s.push_str(&format!("{{{}}}", to_parse_string(&v.guard)));
    }
    if !is_any_type(&v.ty) {
        s.push_str(&format!(":{}", print_type_ref(&v.ty)));
    }
    for label in &v.labels {
        s.push_str(&format!("@{label}"));
    }
    s
}

fn is_any_type(ty: &Atom) -> bool {
    matches!(ty.kind(), AtomKind::NamedRootType(name) if name == "Any")
}

/// Parenthesizes a type annotation's rendering when the type itself is a
/// compound expression (an Apply), so `x:Foo Bar` cannot be misread as three
/// juxtaposed atoms.
fn print_type_ref(ty: &Atom) -> String {
    let rendered = to_parse_string(ty);
    if matches!(ty.kind(), AtomKind::Apply(_)) {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn print_apply(op: &Atom, arg: &Atom) -> String {
    let op_str = if matches!(op.kind(), AtomKind::Apply(_)) {
        format!("({})", to_parse_string(op))
    } else {
        to_parse_string(op)
    };
    let arg_str = if matches!(arg.kind(), AtomKind::Apply(_)) {
        format!("({})", to_parse_string(arg))
    } else {
        to_parse_string(arg)
    };
    format!("{op_str} {arg_str}")
}

fn print_atom_seq(props: &AlgProp, items: &im::Vector<Atom>) -> String {
    let rendered: Vec<String> = items.iter().map(to_parse_string).collect();
    let props_str = print_algprop(props);
    if props_str.is_empty() {
        format!("[{}]", rendered.join(", "))
    } else {
        format!("[{}; {}]", rendered.join(", "), props_str)
    }
}

fn print_algprop(props: &AlgProp) -> String {
    let mut s = String::new();
    print_flag(&mut s, "A", &props.associative);
    print_flag(&mut s, "C", &props.commutative);
    print_flag(&mut s, "I", &props.idempotent);
    if let Some(absorber) = &props.absorber {
        s.push_str(&format!("B[{}]", to_parse_string(absorber)));
    }
    if let Some(identity) = &props.identity {
        s.push_str(&format!("D[{}]", to_parse_string(identity)));
    }
    s
}

fn print_flag(out: &mut String, letter: &str, flag: &Option<Atom>) {
    match flag {
        None => {}
        Some(atom) => match atom.kind() {
            AtomKind::Literal(Literal::Bool(true)) => out.push_str(letter),
            AtomKind::Literal(Literal::Bool(false)) => {
                out.push('!');
                out.push_str(letter);
            }
            _ => out.push_str(&format!("{letter}[{}]", to_parse_string(atom))),
        },
    }
}

fn print_bindings(bindings: &crate::bindings::Bindings) -> String {
    let mut entries: Vec<(&String, &Atom)> = bindings.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let rendered: Vec<String> = entries
        .into_iter()
        .map(|(name, value)| format!("{name}: {}", to_parse_string(value)))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}

fn print_match_atom(data: &crate::atom::MatchAtomData) -> String {
    let guards: Vec<String> = data.guards.iter().map(to_parse_string).collect();
    if guards.is_empty() {
        to_parse_string(&data.pattern_rewrite)
    } else {
        format!("{} when {}", to_parse_string(&data.pattern_rewrite), guards.join(" && "))
    }
}

fn print_special_form(kind: &SpecialFormKind) -> String {
    match kind {
        SpecialFormKind::If { cond, then, alt } => {
            format!("if {} then {} else {}", to_parse_string(cond), to_parse_string(then), to_parse_string(alt))
        }
        SpecialFormKind::Let { name, value, body } => {
            format!("let {name} = {} in {}", to_parse_string(value), to_parse_string(body))
        }
        SpecialFormKind::Quote(inner) => format!("`{}", to_parse_string(inner)),
        SpecialFormKind::Sequence(items) => {
            let rendered: Vec<String> = items.iter().map(to_parse_string).collect();
            format!("{{{}}}", rendered.join("; "))
        }
    }
}

/// A structural, parser-independent encoding used by non-display
/// consumers — notably a persistent cache file key in the form
/// `atom.toParseString + ";" + rulesetSet.toString`. The on-disk file
/// format itself is an external collaborator's concern; this only
/// produces the half of the key this crate owns.
pub fn cache_key_string(atom: &Atom, ruleset_names: &[String]) -> String {
    format!("{};{}", to_parse_string(atom), ruleset_names.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    #[test]
    fn integer_round_trips_as_decimal() {
        assert_eq!(to_parse_string(&Atom::int(42)), "42");
    }

    #[test]
    fn variable_prints_with_sigil_and_type() {
        let v = Atom::variable("x", Atom::named_root_type("Integer"), None, false);
        assert_eq!(to_parse_string(&v), "$x:Integer");
    }

    #[test]
    fn metavariable_uses_double_sigil() {
        let v = Atom::metavariable("m", Atom::any(), None, false);
        assert_eq!(to_parse_string(&v), "$$m");
    }

    #[test]
    fn apply_of_apply_parenthesizes_the_head() {
        let inner = Atom::simple_apply(Atom::symbol("f"), Atom::int(1), Atom::any());
        let outer = Atom::simple_apply(inner, Atom::int(2), Atom::any());
        assert_eq!(to_parse_string(&outer), "('f 1) 2");
    }

    #[test]
    fn algprop_renders_letters_and_bracketed_absorber() {
        let props = AlgProp::new(true, true, false, Some(Atom::symbol("bottom")), None);
        assert_eq!(print_algprop(&props), "AC!IB['bottom]");
    }

    #[test]
    fn map_pair_renders_with_arrow() {
        let pair = Atom::map_pair(Atom::int(1), Atom::int(2));
        assert_eq!(to_parse_string(&pair), "(1 -> 2)");
    }

    #[test]
    fn lambda_renders_with_backslash_and_dot() {
        let lambda = Atom::lambda("x", Atom::any(), Atom::variable("x", Atom::any(), None, false));
        assert_eq!(to_parse_string(&lambda), "\\x.$x");
    }
}
