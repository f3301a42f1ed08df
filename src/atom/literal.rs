//! The ground-value variant of an atom, ordinal 0.

use std::hash::{Hash, Hasher};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Radix a float literal was written in. Only its identity (not its numeric
/// base) affects equality/ordering — two literals with the same significand
/// and exponent but different declared base are distinct atoms, since the
/// base is part of how the literal round-trips through `toParseString`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatBase {
    Bin = 2,
    Oct = 8,
    Dec = 10,
    Hex = 16,
}

impl FloatBase {
    pub fn radix(self) -> u32 {
        self as u32
    }
}

/// A ground value. Integers are arbitrary-precision; floats retain the
/// significand/exponent/base they were constructed with rather than
/// collapsing eagerly to an `f64`, so that re-printing is exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Integer(BigInt),
    String(String),
    Bool(bool),
    Symbol(String),
    Float {
        significand: BigInt,
        exponent: i64,
        base: FloatBase,
    },
}

impl Literal {
    /// The value this float literal denotes, for arithmetic operator handlers.
    pub fn float_value(significand: &BigInt, exponent: i64, base: FloatBase) -> f64 {
        let mantissa: f64 = significand.to_string().parse().unwrap_or(0.0);
        mantissa * (base.radix() as f64).powi(exponent as i32)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Integer(_) => "Integer",
            Literal::String(_) => "String",
            Literal::Bool(_) => "Bool",
            Literal::Symbol(_) => "Symbol",
            Literal::Float { .. } => "Float",
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            (Literal::String(a), Literal::String(b)) => a == b,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Symbol(a), Literal::Symbol(b)) => a == b,
            (
                Literal::Float {
                    significand: sa,
                    exponent: ea,
                    base: ba,
                },
                Literal::Float {
                    significand: sb,
                    exponent: eb,
                    base: bb,
                },
            ) => sa == sb && ea == eb && ba == bb,
            _ => false,
        }
    }
}
impl Eq for Literal {}

/// Ordinal used for tie-breaking between different literal shapes within
/// the Literal variant itself, consistent with the engine's total order
/// being defined "within a variant, compare declared fields in order" —
/// literal *kinds* are treated as the first declared field.
fn kind_ordinal(lit: &Literal) -> u8 {
    match lit {
        Literal::Integer(_) => 0,
        Literal::String(_) => 1,
        Literal::Bool(_) => 2,
        Literal::Symbol(_) => 3,
        Literal::Float { .. } => 4,
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
            (Literal::String(a), Literal::String(b)) => a.cmp(b),
            (Literal::Bool(a), Literal::Bool(b)) => a.cmp(b),
            (Literal::Symbol(a), Literal::Symbol(b)) => a.cmp(b),
            (
                Literal::Float {
                    significand: sa,
                    exponent: ea,
                    base: ba,
                },
                Literal::Float {
                    significand: sb,
                    exponent: eb,
                    base: bb,
                },
            ) => sa
                .cmp(sb)
                .then(ea.cmp(eb))
                .then((*ba as u8).cmp(&(*bb as u8))),
            _ => kind_ordinal(self).cmp(&kind_ordinal(other)),
        }
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        kind_ordinal(self).hash(state);
        match self {
            Literal::Integer(i) => i.hash(state),
            Literal::String(s) => s.hash(state),
            Literal::Bool(b) => b.hash(state),
            Literal::Symbol(s) => s.hash(state),
            Literal::Float {
                significand,
                exponent,
                base,
            } => {
                significand.hash(state);
                exponent.hash(state);
                base.hash(state);
            }
        }
    }
}
