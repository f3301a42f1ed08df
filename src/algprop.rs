//! Algebraic-property descriptors for a sequence, and their resolution into
//! concrete effective flags.

use crate::atom::{Atom, Literal};

/// Up to five optional atoms describing a sequence's algebra. Absent
/// components behave as wildcards when matching one AlgProp against
/// another: a component absent on one side matches anything on the other.
#[derive(Debug, Clone, Default)]
pub struct AlgProp {
    pub associative: Option<Atom>,
    pub commutative: Option<Atom>,
    pub idempotent: Option<Atom>,
    pub absorber: Option<Atom>,
    pub identity: Option<Atom>,
}

/// The boolean flags an AlgProp resolves to once its flag atoms are known
/// literals. Absorber/identity stay as atoms — normalization compares
/// elements against them directly, it doesn't need them reduced to bools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectiveProps {
    pub associative: bool,
    pub commutative: bool,
    pub idempotent: bool,
}

impl AlgProp {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(
        associative: bool,
        commutative: bool,
        idempotent: bool,
        absorber: Option<Atom>,
        identity: Option<Atom>,
    ) -> Self {
        Self {
            associative: Some(Atom::bool(associative)),
            commutative: Some(Atom::bool(commutative)),
            idempotent: Some(Atom::bool(idempotent)),
            absorber,
            identity,
        }
    }

    fn flag_literal(flag: &Option<Atom>) -> Option<bool> {
        match flag {
            None => Some(false),
            Some(atom) => match atom.kind() {
                crate::atom::AtomKind::Literal(Literal::Bool(b)) => Some(*b),
                _ => None,
            },
        }
    }

    /// Resolves all three boolean flags, or `None` if any present flag atom
    /// is not yet a literal boolean — a sequence with an unresolved flag
    /// cannot be normalized until the flag atom is rewritten.
    pub fn effective_flags(&self) -> Option<EffectiveProps> {
        Some(EffectiveProps {
            associative: Self::flag_literal(&self.associative)?,
            commutative: Self::flag_literal(&self.commutative)?,
            idempotent: Self::flag_literal(&self.idempotent)?,
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.effective_flags().is_some()
    }

    /// Structural equality between two property sets, used by sequence
    /// flattening to recognize a nested AtomSeq with equal properties as a
    /// candidate for splicing in.
    pub fn structurally_eq(&self, other: &AlgProp) -> bool {
        fn eq_opt(a: &Option<Atom>, b: &Option<Atom>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        eq_opt(&self.associative, &other.associative)
            && eq_opt(&self.commutative, &other.commutative)
            && eq_opt(&self.idempotent, &other.idempotent)
            && eq_opt(&self.absorber, &other.absorber)
            && eq_opt(&self.identity, &other.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flags_resolve_false() {
        let props = AlgProp::none();
        assert_eq!(
            props.effective_flags(),
            Some(EffectiveProps {
                associative: false,
                commutative: false,
                idempotent: false
            })
        );
    }

    #[test]
    fn unresolved_flag_blocks_resolution() {
        let props = AlgProp {
            associative: Some(Atom::variable("flag", Atom::any(), None, false)),
            ..AlgProp::none()
        };
        assert_eq!(props.effective_flags(), None);
    }

    #[test]
    fn ac_with_identity_and_absorber() {
        let props = AlgProp::new(true, true, false, Some(Atom::symbol("bottom")), Some(Atom::int(0)));
        let eff = props.effective_flags().unwrap();
        assert!(eff.associative && eff.commutative && !eff.idempotent);
    }
}
