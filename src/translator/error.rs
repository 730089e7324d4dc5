//! Translation Error Types

use std::fmt;

use datalog_ast::Type;
use thiserror::Error;

use crate::ast::{Expression, Range};

use super::environment::{Environment, ScopeSnapshot};
use super::relation::Signature;

/// What went wrong, independent of where
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationErrorKind {
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Variable {0} already in scope")]
    AlreadyBound(String),

    #[error("{context} must have arity {expected}, but has arity {found}")]
    ArityMismatch {
        context: String,
        expected: String,
        found: usize,
    },

    #[error("{context} must have type {expected}, but has type {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("Relations in {operator} must have {relationship} signatures, but got {left} and {right}")]
    SignatureMismatch {
        operator: String,
        relationship: String,
        left: Signature,
        right: Signature,
    },

    #[error("Wildcard _ is only allowed as an operand of a dot-join")]
    MisplacedWildcard,

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslationErrorKind {
    pub(crate) fn arity(context: &str, expected: &str, found: usize) -> Self {
        TranslationErrorKind::ArityMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            found,
        }
    }

    pub(crate) fn ty(context: &str, expected: Type, found: Type) -> Self {
        TranslationErrorKind::TypeMismatch {
            context: context.to_string(),
            expected,
            found,
        }
    }
}

/// A failure located at the smallest expression that raised it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TranslationError {
    /// Range of the failing expression
    pub failing: Range,
    /// Node type of the failing expression (`binary`, `identifier`, ...)
    pub node: &'static str,
    /// Scope in effect at the failing expression
    pub environment: ScopeSnapshot,
    #[source]
    pub cause: TranslationErrorKind,
}

impl TranslationError {
    pub fn new(expr: &Expression, env: &Environment, cause: TranslationErrorKind) -> Self {
        TranslationError {
            failing: expr.range.clone(),
            node: expr.type_name(),
            environment: env.snapshot(),
            cause,
        }
    }

    /// Source text of the failing expression
    pub fn failing_text(&self) -> &str {
        self.failing.text()
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Translating {} {}: {}",
            self.node,
            self.failing.text(),
            self.cause
        )
    }
}

/// Failure while translating one node: either raised here, or already
/// located by a subexpression. Only `Raised` picks up the current range,
/// so an error is located exactly once.
#[derive(Debug)]
pub(crate) enum Fault {
    Raised(TranslationErrorKind),
    Located(TranslationError),
}

impl Fault {
    pub(crate) fn locate(self, expr: &Expression, env: &Environment) -> TranslationError {
        match self {
            Fault::Raised(kind) => TranslationError::new(expr, env, kind),
            Fault::Located(error) => error,
        }
    }
}

impl From<TranslationErrorKind> for Fault {
    fn from(kind: TranslationErrorKind) -> Self {
        Fault::Raised(kind)
    }
}

impl From<TranslationError> for Fault {
    fn from(error: TranslationError) -> Self {
        Fault::Located(error)
    }
}
