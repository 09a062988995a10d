use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Every way a statement, a declaration or a configuration can be rejected.
///
/// All variants are fatal for the operation that produced them; warnings are
/// reported separately as [`Diagnostic`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DcecError {
    #[error("parentheses mismatch in `{0}`")]
    ParenMismatch(String),

    #[error("sort {sort} names parent {parent}, which is not declared")]
    UndeclaredParent { sort: String, parent: String },

    #[error("atomic {name} cannot be both {existing} and {requested}")]
    AtomicConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("operator `{symbol}` is ambiguous: {reason}")]
    AmbiguousOperator { symbol: String, reason: String },

    #[error(
        "more than one interpretation of function {name} for arguments ({}): {}",
        .given.join(", "),
        .candidates.join(" | ")
    )]
    AmbiguousOverload {
        name: String,
        given: Vec<String>,
        candidates: Vec<String>,
    },

    #[error(
        "function {name} does not take arguments ({}); possible inputs: {}",
        .given.join(", "),
        .expected.join(" | ")
    )]
    NoMatchingOverload {
        name: String,
        given: Vec<String>,
        expected: Vec<String>,
    },

    #[error("return sort of inline function {0} was never given")]
    UnresolvedInlineReturnType(String),

    #[error("invalid sort annotation {sort}: {reason}")]
    InvalidSortAnnotation { sort: String, reason: String },

    #[error("malformed quantifier {keyword}: {reason}")]
    MalformedQuantifier { keyword: String, reason: String },

    #[error("argument {arg} of inline function {function} has an unknown sort")]
    UntypedArgument { function: String, arg: String },

    #[error("{0} is not a valid function name")]
    InvalidFunctionName(String),

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("nesting exceeds the maximum depth of {0}")]
    RecursionLimit(usize),

    #[error("invalid prototype `{text}`: {reason}")]
    InvalidPrototype { text: String, reason: String },

    #[error("{path}: {reason}")]
    Config { path: String, reason: String },
}

impl DcecError {
    pub fn code(&self) -> &'static str {
        match self {
            DcecError::ParenMismatch(_) => "E-PAREN",
            DcecError::UndeclaredParent { .. } => "E-SORT",
            DcecError::AtomicConflict { .. } => "E-ATOMIC",
            DcecError::AmbiguousOperator { .. } => "E-OPERATOR",
            DcecError::AmbiguousOverload { .. } | DcecError::NoMatchingOverload { .. } => {
                "E-OVERLOAD"
            }
            DcecError::UnresolvedInlineReturnType(_) | DcecError::UntypedArgument { .. } => {
                "E-INLINE"
            }
            DcecError::InvalidSortAnnotation { .. } => "E-ANNOTATION",
            DcecError::MalformedQuantifier { .. } => "E-QUANT",
            DcecError::InvalidFunctionName(_) | DcecError::MalformedExpression(_) => "E-EXPR",
            DcecError::RecursionLimit(_) => "E-DEPTH",
            DcecError::InvalidPrototype { .. } => "E-PROTOTYPE",
            DcecError::Config { .. } => "E-CONFIG",
        }
    }
}

impl From<DcecError> for Diagnostic {
    fn from(err: DcecError) -> Self {
        Diagnostic::new(err.code(), err.to_string(), None)
    }
}
