//! Unified error type for the engine.
//!
//! Every throw-class failure — timeout, unbounded recursion, operator
//! conflicts, unknown operators, and malformed special-form shapes — is a
//! variant here. Match failures are *not* part of this enum: they are
//! [`crate::matcher::Outcome::Fail`] values that never cross a `Result`
//! boundary (see [`crate::matcher`]).

use miette::Diagnostic;
use thiserror::Error;

use crate::span::Loc;

/// The single error type produced by engine operations.
#[derive(Debug, Error, Diagnostic, Clone)]
pub enum ElisionError {
    #[error("rewrite session timed out after {seconds}s")]
    #[diagnostic(
        code(elision::timeout),
        help("the atom was returned as-is at its current, possibly non-normal, state")
    )]
    Timeout { seconds: u64 },

    #[error("unbounded recursion applying operator '{operator}' to {argument}")]
    #[diagnostic(code(elision::unbounded_recursion))]
    UnboundedRecursion { operator: String, argument: String },

    #[error("operator '{name}' is already defined")]
    #[diagnostic(
        code(elision::operator_conflict),
        help("pass allow_redefinition(true) on the operator library to permit overwriting")
    )]
    OperatorConflict { name: String },

    #[error("unknown operator '{name}'")]
    #[diagnostic(code(elision::unknown_operator))]
    UnknownOperator { name: String },

    #[error("malformed special form: {reason}")]
    #[diagnostic(code(elision::malformed_special_form))]
    MalformedSpecialForm {
        reason: String,
        loc: Option<MietteLoc>,
    },

    #[error("internal engine error: {message}")]
    #[diagnostic(
        code(elision::internal),
        help("this indicates an invariant violation; please report it")
    )]
    Internal { message: String },
}

/// Thin wrapper so [`Loc`] can ride along in a diagnostic without pulling
/// `miette::SourceSpan` plumbing into the atom model itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MietteLoc(pub Loc);

impl std::fmt::Display for MietteLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ElisionError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        ElisionError::MalformedSpecialForm {
            reason: reason.into(),
            loc: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ElisionError::Internal {
            message: message.into(),
        }
    }
}
