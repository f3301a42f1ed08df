//! Operator library: named operators, their declared shape, and lookup.

use std::collections::HashMap;
use std::rc::Rc;

use crate::atom::Atom;
use crate::bindings::Bindings;
use crate::error::ElisionError;
use crate::rules::Rule;

/// Data handed to a native operator handler: the operator itself, the
/// actual argument atom it was applied to, and the parameter→argument
/// bindings already resolved for a `SymbolicOperator`'s formal parameters.
pub struct ApplyData {
    pub operator: Atom,
    pub argument: Atom,
    pub bindings: Bindings,
}

/// A native handler closure for a `SymbolicOperator`. May recursively
/// invoke the Apply smart constructor with `bypass = true` to avoid
/// re-entering itself.
pub type NativeHandler = Rc<dyn Fn(&ApplyData) -> Result<Atom, ElisionError>>;

/// A single declared formal parameter of a `SymbolicOperator`.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: Atom,
}

/// The two shapes an operator can take.
#[derive(Clone)]
pub enum OperatorShape {
    /// A sequence of rewrite rules acting as pattern-directed cases.
    CaseOperator { cases: Vec<Rule> },
    /// A formal parameter list, declared return type, and optional native
    /// handler. A fully typed operator is this shape with `return_type`
    /// resolved rather than left as `Any`.
    SymbolicOperator {
        params: Vec<Parameter>,
        return_type: Atom,
        handler: Option<NativeHandler>,
    },
}

impl std::fmt::Debug for OperatorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorShape::CaseOperator { cases } => f.debug_struct("CaseOperator").field("cases", &cases.len()).finish(),
            OperatorShape::SymbolicOperator { params, return_type, handler } => f
                .debug_struct("SymbolicOperator")
                .field("params", params)
                .field("return_type", return_type)
                .field("has_handler", &handler.is_some())
                .finish(),
        }
    }
}

/// A registered operator: its name and shape.
#[derive(Debug, Clone)]
pub struct Operator {
    pub name: String,
    pub shape: OperatorShape,
    /// Whether this operator's handler should still run when applied to a
    /// meta-term argument. `false` by default: applying an operator to an
    /// unresolved meta-term normally just builds a `SimpleApply` and waits
    /// for the argument to ground out.
    pub even_meta: bool,
}

impl Operator {
    pub fn new(name: impl Into<String>, shape: OperatorShape) -> Self {
        Operator {
            name: name.into(),
            shape,
            even_meta: false,
        }
    }

    pub fn with_even_meta(mut self, even_meta: bool) -> Self {
        self.even_meta = even_meta;
        self
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self.shape, OperatorShape::SymbolicOperator { .. })
    }

    pub fn is_rewriter(&self) -> bool {
        matches!(self.shape, OperatorShape::CaseOperator { .. })
    }

    pub fn apply(&self, arg: &Atom, bindings: Bindings) -> Result<Atom, ElisionError> {
        match &self.shape {
            OperatorShape::SymbolicOperator { handler: Some(h), .. } => h(&ApplyData {
                operator: Atom::operator_ref(self.name.clone()),
                argument: arg.clone(),
                bindings,
            }),
            OperatorShape::SymbolicOperator { handler: None, return_type, .. } => {
                Ok(Atom::simple_apply(Atom::operator_ref(self.name.clone()), arg.clone(), return_type.clone()))
            }
            OperatorShape::CaseOperator { .. } => Err(ElisionError::internal(format!(
                "operator '{}' is a CaseOperator, not Applicable",
                self.name
            ))),
        }
    }
}

/// Named, insertion-ordered operator registry.
#[derive(Debug, Clone, Default)]
pub struct OperatorLibrary {
    operators: HashMap<String, Operator>,
    insertion_order: Vec<String>,
    allow_redefinition: bool,
}

impl OperatorLibrary {
    pub fn new() -> Self {
        let mut lib = OperatorLibrary {
            operators: HashMap::new(),
            insertion_order: Vec::new(),
            allow_redefinition: true,
        };
        lib.register_builtins();
        lib
    }

    pub fn with_allow_redefinition(mut self, allow: bool) -> Self {
        self.allow_redefinition = allow;
        self
    }

    fn register_builtins(&mut self) {
        // MAP: element-wise application of a function over a sequence.
        self.force_register(Operator::new(
            "MAP",
            OperatorShape::SymbolicOperator {
                params: vec![
                    Parameter { name: "f".to_string(), ty: Atom::any() },
                    Parameter { name: "xs".to_string(), ty: Atom::any() },
                ],
                return_type: Atom::any(),
                handler: None,
            },
        ));
        // xx: the built-in "apply twice" combinator.
        self.force_register(Operator::new(
            "xx",
            OperatorShape::SymbolicOperator {
                params: vec![Parameter { name: "x".to_string(), ty: Atom::any() }],
                return_type: Atom::any(),
                handler: None,
            },
        ));
        // LIST: constructs a plain (non-algebraic) AtomSeq from its argument.
        self.force_register(Operator::new(
            "LIST",
            OperatorShape::SymbolicOperator {
                params: vec![Parameter { name: "items".to_string(), ty: Atom::any() }],
                return_type: Atom::any(),
                handler: None,
            },
        ));
    }

    fn force_register(&mut self, op: Operator) {
        if !self.operators.contains_key(&op.name) {
            self.insertion_order.push(op.name.clone());
        } else {
            log::warn!("operator '{}' redefined, overwriting previous definition", op.name);
        }
        self.operators.insert(op.name.clone(), op);
    }

    /// Registers `op`, honoring `allow_redefinition`.
    pub fn register(&mut self, op: Operator) -> Result<(), ElisionError> {
        if self.operators.contains_key(&op.name) && !self.allow_redefinition {
            return Err(ElisionError::OperatorConflict { name: op.name });
        }
        log::debug!("registering operator '{}'", op.name);
        self.force_register(op);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.insertion_order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_preregistered() {
        let lib = OperatorLibrary::new();
        assert!(lib.get("MAP").is_some());
        assert!(lib.get("xx").is_some());
        assert!(lib.get("LIST").is_some());
    }

    #[test]
    fn redefinition_rejected_when_disallowed() {
        let mut lib = OperatorLibrary::new().with_allow_redefinition(false);
        let err = lib.register(Operator::new("MAP", OperatorShape::CaseOperator { cases: vec![] }));
        assert!(err.is_err());
    }

    #[test]
    fn redefinition_allowed_by_default() {
        let mut lib = OperatorLibrary::new();
        assert!(lib
            .register(Operator::new("MAP", OperatorShape::CaseOperator { cases: vec![] }))
            .is_ok());
    }
}
