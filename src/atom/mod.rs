//! The atom model: a single immutable, reference-counted term
//! representation shared by patterns, subjects, and rewrite results alike.

mod hash;
mod literal;
mod order;

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use im::Vector as ImVector;

pub use hash::Fingerprint;
pub use literal::{FloatBase, Literal};

use crate::algprop::AlgProp;
use crate::bindings::Bindings;

/// Ordinal of each [`AtomKind`] variant, fixing the first tier of the total
/// order: atoms of different variants order by variant ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Ordinal {
    Literal = 0,
    AlgProp = 1,
    MetaVariable = 2,
    Variable = 3,
    Apply = 4,
    AtomSeq = 5,
    BindingsAtom = 6,
    Lambda = 7,
    MapPair = 8,
    MatchAtom = 9,
    SpecialForm = 10,
    RulesetRef = 11,
    OperatorRef = 12,
    NamedRootType = 13,
}

/// The declared fields of a Variable or MetaVariable atom.
#[derive(Debug, Clone)]
pub struct VarData {
    pub name: String,
    pub ty: Atom,
    pub guard: Atom,
    pub labels: Vec<String>,
    pub by_name: bool,
}

/// The declared fields of an Apply atom.
#[derive(Debug, Clone)]
pub struct ApplyData {
    pub op: Atom,
    pub arg: Atom,
}

/// The declared fields of an AtomSeq atom.
#[derive(Debug, Clone)]
pub struct SeqData {
    pub props: AlgProp,
    pub items: ImVector<Atom>,
}

/// The declared fields of a Lambda atom.
#[derive(Debug, Clone)]
pub struct LambdaData {
    pub var_name: String,
    pub var_type: Atom,
    pub body: Atom,
}

/// The declared fields of a MatchAtom atom.
#[derive(Debug, Clone)]
pub struct MatchAtomData {
    pub pattern_rewrite: Atom,
    pub guards: ImVector<Atom>,
}

/// The shapes a special form can take: a closed set of control constructs
/// distinct from ordinary Applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialFormKind {
    If { cond: Atom, then: Atom, alt: Atom },
    Let { name: String, value: Atom, body: Atom },
    Quote(Atom),
    Sequence(ImVector<Atom>),
}

#[derive(Debug, Clone)]
pub struct SpecialFormData {
    pub kind: SpecialFormKind,
}

/// A type reference. Most atoms point to another atom as their type; the
/// Type Universe is defined to be its own type, which an `Rc` graph cannot
/// represent as a literal cycle constructed top-down, so that one case is
/// carried by a sentinel instead of `TypeRef::Of`.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Of(Atom),
    SelfRef,
}

pub use crate::span::Loc;

/// The atom payload, one variant per ordinal.
#[derive(Debug, Clone)]
pub enum AtomKind {
    Literal(Literal),
    AlgProp(AlgProp),
    MetaVariable(VarData),
    Variable(VarData),
    Apply(ApplyData),
    AtomSeq(SeqData),
    BindingsAtom(Bindings),
    Lambda(LambdaData),
    MapPair(Atom, Atom),
    MatchAtom(MatchAtomData),
    SpecialForm(SpecialFormData),
    RulesetRef(String),
    OperatorRef(String),
    NamedRootType(String),
}

impl AtomKind {
    pub fn ordinal(&self) -> Ordinal {
        match self {
            AtomKind::Literal(_) => Ordinal::Literal,
            AtomKind::AlgProp(_) => Ordinal::AlgProp,
            AtomKind::MetaVariable(_) => Ordinal::MetaVariable,
            AtomKind::Variable(_) => Ordinal::Variable,
            AtomKind::Apply(_) => Ordinal::Apply,
            AtomKind::AtomSeq(_) => Ordinal::AtomSeq,
            AtomKind::BindingsAtom(_) => Ordinal::BindingsAtom,
            AtomKind::Lambda(_) => Ordinal::Lambda,
            AtomKind::MapPair(..) => Ordinal::MapPair,
            AtomKind::MatchAtom(_) => Ordinal::MatchAtom,
            AtomKind::SpecialForm(_) => Ordinal::SpecialForm,
            AtomKind::RulesetRef(_) => Ordinal::RulesetRef,
            AtomKind::OperatorRef(_) => Ordinal::OperatorRef,
            AtomKind::NamedRootType(_) => Ordinal::NamedRootType,
        }
    }
}

/// The backing node behind an [`Atom`] handle. Fields other than `kind` and
/// `ty` are derived at construction time and held fixed thereafter. `loc` is
/// metadata only — it does not participate in hashing, equality, or
/// ordering, since structural equality is defined over variant and declared
/// fields, and a source position is neither.
#[derive(Clone)]
pub struct AtomNode {
    pub kind: AtomKind,
    pub ty: TypeRef,
    pub hash: u64,
    pub other_hash: u64,
    pub depth: u32,
    pub is_constant: bool,
    pub is_term: bool,
    pub de_bruijn_index: u32,
    pub loc: Option<Loc>,
}

/// A handle to an atom. Cheap to clone (`Rc`); all engine state — patterns,
/// subjects, bindings values, rule sides — is built from this one type.
#[derive(Clone)]
pub struct Atom(Rc<AtomNode>);

impl Atom {
    fn new(kind: AtomKind, ty: TypeRef) -> Atom {
        let ordinal = kind.ordinal() as u8;
        let ty_fp = match &ty {
            TypeRef::SelfRef => (0, 0),
            TypeRef::Of(t) => t.fingerprint(),
        };
        let (h1, h2) = hash::compute_fingerprint(&kind, ordinal, ty_fp);
        let depth = Self::compute_depth(&kind);
        let is_constant = Self::compute_is_constant(&kind);
        let is_term = Self::compute_is_term(&kind);
        let de_bruijn_index = Self::compute_de_bruijn_index(&kind);
        Atom(Rc::new(AtomNode {
            kind,
            ty,
            hash: h1,
            other_hash: h2,
            depth,
            is_constant,
            is_term,
            de_bruijn_index,
            loc: None,
        }))
    }

    /// Attaches (or replaces) this atom's recorded source location, leaving
    /// every derived field (hash, depth, ...) untouched.
    pub fn with_loc(&self, loc: Loc) -> Atom {
        let mut node = (*self.0).clone();
        node.loc = Some(loc);
        Atom(Rc::new(node))
    }

    pub fn loc(&self) -> Option<&Loc> {
        self.0.loc.as_ref()
    }

    /// Rebuilds this atom with the same kind but a new declared type,
    /// recomputing the fingerprint (which folds in the type's fingerprint)
    /// while preserving `loc`. Used by the rewriter when an atom's type
    /// rewrites to something new but the atom's own payload does not.
    pub(crate) fn with_type(&self, new_ty: Atom) -> Atom {
        let rebuilt = Atom::new(self.0.kind.clone(), TypeRef::Of(new_ty));
        match &self.0.loc {
            Some(loc) => rebuilt.with_loc(loc.clone()),
            None => rebuilt,
        }
    }

    fn compute_depth(kind: &AtomKind) -> u32 {
        let child_depths: Vec<u32> = match kind {
            AtomKind::Apply(d) => vec![d.op.depth(), d.arg.depth()],
            AtomKind::AtomSeq(d) => d.items.iter().map(Atom::depth).collect(),
            AtomKind::Lambda(d) => vec![d.body.depth()],
            AtomKind::MapPair(l, r) => vec![l.depth(), r.depth()],
            AtomKind::MatchAtom(d) => {
                let mut v = vec![d.pattern_rewrite.depth()];
                v.extend(d.guards.iter().map(Atom::depth));
                v
            }
            AtomKind::Variable(d) | AtomKind::MetaVariable(d) => vec![d.guard.depth()],
            _ => vec![],
        };
        1 + child_depths.into_iter().max().unwrap_or(0)
    }

    /// A term is "constant" when it contains no Variable or MetaVariable
    /// anywhere in its structure — used by the matcher's fast path and by
    /// rule indexing.
    fn compute_is_constant(kind: &AtomKind) -> bool {
        match kind {
            AtomKind::Variable(_) | AtomKind::MetaVariable(_) => false,
            AtomKind::Apply(d) => d.op.is_constant() && d.arg.is_constant(),
            AtomKind::AtomSeq(d) => d.items.iter().all(Atom::is_constant),
            AtomKind::Lambda(d) => d.body.is_constant(),
            AtomKind::MapPair(l, r) => l.is_constant() && r.is_constant(),
            AtomKind::MatchAtom(d) => d.pattern_rewrite.is_constant() && d.guards.iter().all(Atom::is_constant),
            _ => true,
        }
    }

    /// Whether an atom contains no metavariable. A plain Variable does
    /// not disqualify a term — only a MetaVariable does, and only a
    /// non-term atom blocks operator handler invocation.
    fn compute_is_term(kind: &AtomKind) -> bool {
        match kind {
            AtomKind::MetaVariable(_) => false,
            AtomKind::Variable(d) => d.guard.is_term(),
            AtomKind::Apply(d) => d.op.is_term() && d.arg.is_term(),
            AtomKind::AtomSeq(d) => d.items.iter().all(Atom::is_term),
            AtomKind::Lambda(d) => d.body.is_term(),
            AtomKind::MapPair(l, r) => l.is_term() && r.is_term(),
            AtomKind::MatchAtom(d) => d.pattern_rewrite.is_term() && d.guards.iter().all(Atom::is_term),
            _ => true,
        }
    }

    pub fn kind(&self) -> &AtomKind {
        &self.0.kind
    }

    pub fn hash_value(&self) -> u64 {
        self.0.hash
    }

    pub fn other_hash_value(&self) -> u64 {
        self.0.other_hash
    }

    pub fn fingerprint(&self) -> Fingerprint {
        (self.0.hash, self.0.other_hash)
    }

    pub fn depth(&self) -> u32 {
        self.0.depth
    }

    pub fn is_constant(&self) -> bool {
        self.0.is_constant
    }

    /// False iff this atom contains a metavariable anywhere in its
    /// structure.
    pub fn is_term(&self) -> bool {
        self.0.is_term
    }

    /// The De Bruijn-style binding depth: max over children, incremented at
    /// a lambda binding. This engine represents alpha-equivalence by renaming
    /// (see [`rename_in_lambda_body`]) rather than a literal De Bruijn
    /// encoding, so this field is diagnostic only — it is not consulted by
    /// equality or hashing.
    pub fn de_bruijn_index(&self) -> u32 {
        self.0.de_bruijn_index
    }

    fn compute_de_bruijn_index(kind: &AtomKind) -> u32 {
        let child_max = match kind {
            AtomKind::Apply(d) => d.op.de_bruijn_index().max(d.arg.de_bruijn_index()),
            AtomKind::AtomSeq(d) => d.items.iter().map(Atom::de_bruijn_index).max().unwrap_or(0),
            AtomKind::Lambda(d) => d.body.de_bruijn_index() + 1,
            AtomKind::MapPair(l, r) => l.de_bruijn_index().max(r.de_bruijn_index()),
            AtomKind::MatchAtom(d) => d
                .guards
                .iter()
                .map(Atom::de_bruijn_index)
                .fold(d.pattern_rewrite.de_bruijn_index(), u32::max),
            AtomKind::Variable(d) | AtomKind::MetaVariable(d) => d.guard.de_bruijn_index(),
            _ => 0,
        };
        child_max
    }

    pub fn ordinal(&self) -> Ordinal {
        self.0.kind.ordinal()
    }

    /// Resolves this atom's type. The Type Universe's type is itself.
    pub fn type_of(&self) -> Atom {
        match &self.0.ty {
            TypeRef::Of(t) => t.clone(),
            TypeRef::SelfRef => self.clone(),
        }
    }

    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True only for the Type Universe: the one atom declared as its own
    /// type. Consulted wherever type-aware equality/ordering would
    /// otherwise recurse into `type_of()` forever.
    pub fn is_self_typed(&self) -> bool {
        matches!(self.0.ty, TypeRef::SelfRef)
    }

    // -- Constructors -----------------------------------------------------

    pub fn any() -> Atom {
        Self::named_root_type("Any")
    }

    pub fn none_type() -> Atom {
        Self::named_root_type("None")
    }

    /// The Type Universe singleton: a NamedRootType atom that is its own type.
    pub fn type_universe() -> Atom {
        Atom::new(AtomKind::NamedRootType("Type".to_string()), TypeRef::SelfRef)
    }

    pub fn named_root_type(name: impl Into<String>) -> Atom {
        Atom::new(AtomKind::NamedRootType(name.into()), TypeRef::Of(Atom::type_universe()))
    }

    fn literal(lit: Literal, ty_name: &'static str) -> Atom {
        Atom::new(AtomKind::Literal(lit), TypeRef::Of(Atom::named_root_type(ty_name)))
    }

    /// A string literal carrying a caller-supplied type, rather than the
    /// default `String` root type. Used by the Apply smart constructor's
    /// string-concatenation step, which produces a new string literal typed
    /// with the operator's own type rather than the plain `String` root.
    pub fn string_with_type(s: impl Into<String>, ty: Atom) -> Atom {
        Atom::new(AtomKind::Literal(Literal::String(s.into())), TypeRef::Of(ty))
    }

    pub fn int(v: i64) -> Atom {
        Self::literal(Literal::Integer(num_bigint::BigInt::from(v)), "Integer")
    }

    pub fn bigint(v: num_bigint::BigInt) -> Atom {
        Self::literal(Literal::Integer(v), "Integer")
    }

    pub fn string(s: impl Into<String>) -> Atom {
        Self::literal(Literal::String(s.into()), "String")
    }

    pub fn bool(b: bool) -> Atom {
        Self::literal(Literal::Bool(b), "Bool")
    }

    pub fn symbol(s: impl Into<String>) -> Atom {
        Self::literal(Literal::Symbol(s.into()), "Symbol")
    }

    pub fn float(significand: num_bigint::BigInt, exponent: i64, base: FloatBase) -> Atom {
        Self::literal(
            Literal::Float {
                significand,
                exponent,
                base,
            },
            "Float",
        )
    }

    pub fn algprop(props: AlgProp) -> Atom {
        Atom::new(AtomKind::AlgProp(props), TypeRef::Of(Atom::named_root_type("AlgProp")))
    }

    fn var_data(name: impl Into<String>, ty: Atom, guard: Option<Atom>, by_name: bool) -> VarData {
        VarData {
            name: name.into(),
            ty,
            guard: guard.unwrap_or_else(Atom::bool_true_guard),
            labels: Vec::new(),
            by_name,
        }
    }

    /// The default "always succeeds" guard: the literal `true`.
    fn bool_true_guard() -> Atom {
        Atom::bool(true)
    }

    pub fn variable(name: impl Into<String>, ty: Atom, guard: Option<Atom>, by_name: bool) -> Atom {
        let data = Self::var_data(name, ty.clone(), guard, by_name);
        Atom::new(AtomKind::Variable(data), TypeRef::Of(ty))
    }

    pub fn metavariable(name: impl Into<String>, ty: Atom, guard: Option<Atom>, by_name: bool) -> Atom {
        let data = Self::var_data(name, ty.clone(), guard, by_name);
        Atom::new(AtomKind::MetaVariable(data), TypeRef::Of(ty))
    }

    pub fn variable_labeled(
        name: impl Into<String>,
        ty: Atom,
        guard: Option<Atom>,
        by_name: bool,
        labels: Vec<String>,
    ) -> Atom {
        let mut data = Self::var_data(name, ty.clone(), guard, by_name);
        data.labels = labels;
        Atom::new(AtomKind::Variable(data), TypeRef::Of(ty))
    }

    /// A plain (non-operator) Apply, whose type is declared by the caller
    /// (the rewriter resolves an operator's result type, this constructor
    /// just records what it was told).
    pub fn simple_apply(op: Atom, arg: Atom, ty: Atom) -> Atom {
        Atom::new(AtomKind::Apply(ApplyData { op, arg }), TypeRef::Of(ty))
    }

    /// An Apply of an OperatorRef atom, whose declared return type comes
    /// from the operator's shape.
    pub fn op_apply(op_name: impl Into<String>, arg: Atom, ty: Atom) -> Atom {
        let op = Atom::operator_ref(op_name);
        Atom::new(AtomKind::Apply(ApplyData { op, arg }), TypeRef::Of(ty))
    }

    pub fn atom_seq(props: AlgProp, items: impl IntoIterator<Item = Atom>, ty: Atom) -> Atom {
        Atom::new(
            AtomKind::AtomSeq(SeqData {
                props,
                items: items.into_iter().collect(),
            }),
            TypeRef::Of(ty),
        )
    }

    pub fn bindings_atom(bindings: Bindings) -> Atom {
        Atom::new(
            AtomKind::BindingsAtom(bindings),
            TypeRef::Of(Atom::named_root_type("Bindings")),
        )
    }

    pub fn lambda(var_name: impl Into<String>, var_type: Atom, body: Atom) -> Atom {
        let arrow_ty = Atom::named_root_type("Lambda");
        Atom::new(
            AtomKind::Lambda(LambdaData {
                var_name: var_name.into(),
                var_type,
                body,
            }),
            TypeRef::Of(arrow_ty),
        )
    }

    pub fn map_pair(left: Atom, right: Atom) -> Atom {
        Atom::new(AtomKind::MapPair(left, right), TypeRef::Of(Atom::named_root_type("MapPair")))
    }

    pub fn match_atom(pattern_rewrite: Atom, guards: impl IntoIterator<Item = Atom>) -> Atom {
        Atom::new(
            AtomKind::MatchAtom(MatchAtomData {
                pattern_rewrite,
                guards: guards.into_iter().collect(),
            }),
            TypeRef::Of(Atom::named_root_type("MatchAtom")),
        )
    }

    pub fn special_form(kind: SpecialFormKind) -> Atom {
        Atom::new(
            AtomKind::SpecialForm(SpecialFormData { kind }),
            TypeRef::Of(Atom::named_root_type("SpecialForm")),
        )
    }

    pub fn ruleset_ref(name: impl Into<String>) -> Atom {
        Atom::new(
            AtomKind::RulesetRef(name.into()),
            TypeRef::Of(Atom::named_root_type("Ruleset")),
        )
    }

    pub fn operator_ref(name: impl Into<String>) -> Atom {
        Atom::new(
            AtomKind::OperatorRef(name.into()),
            TypeRef::Of(Atom::named_root_type("Operator")),
        )
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom#{:x}", self.0.hash)
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || order::atoms_equal(self, other)
    }
}
impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        order::cmp_atoms(self, other)
    }
}

pub use order::{atoms_equal, fast_eq};

/// Rebuilds `atom` with every free occurrence of the variable `from` renamed
/// to `to`, stopping at a nested binder that rebinds `from`. Used by the
/// matcher to align a Lambda subject's bound-variable name with the
/// pattern's before comparing bodies — variables bound by the lambda itself
/// are protected from renaming by their de Bruijn index.
pub fn rename_in_lambda_body(from: &str, to: &str, atom: &Atom) -> Atom {
    order::rename_free(atom, from, to)
}
