//! Error taxonomy shared by every layer of the query engine.
//!
//! Each concern owns its own error enum (lexing, parsing, evaluation) and
//! [`QueryError`] is the crate-wide error every public fallible operation
//! returns. All errors surface synchronously to the caller of the fluent or
//! request call that triggered them; nothing is retried.

use thiserror::Error;

use crate::lexer::Position;

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

/// The lexer could not turn source text into a token stream.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at line {}, column {}", position.line, position.column)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

/// The source extractor failed before the parser saw a single token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceExtractionError {
    /// The callable is opaque: no source text was attached to it.
    #[error("function has no extractable source")]
    NoSource,

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// The token stream does not describe a supported function body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    /// The construct is well-formed but has no expression node.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("invalid assignment target: {0}")]
    InvalidAssignmentTarget(String),

    #[error("unknown cast type: {0}")]
    InvalidCastType(String),
}

/// Errors raised while interpreting a parsed closure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("type error: {0}")]
    TypeError(String),

    #[error("undefined variable: ${0}")]
    UndefinedVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unsupported at evaluation: {0}")]
    Unsupported(String),

    #[error("{function} expects {expected} argument(s), {given} given")]
    ArgumentCount {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("division by zero")]
    DivisionByZero,
}

/// The crate-wide error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    SourceExtraction(#[from] SourceExtractionError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    /// `then_by`/`and_by` called when the last segment is of the wrong kind.
    #[error("invalid call to {method}: {required} must be called first")]
    InvalidChain {
        method: &'static str,
        required: &'static str,
    },

    /// Mutation attempted through the read-only index surface.
    #[error("invalid call to {method}: method is not supported")]
    UnsupportedOperation { method: &'static str },

    /// An argument of the wrong kind, e.g. a non-iterable value where a
    /// sequence was required.
    #[error("invalid argument for {method}: expecting {expected}, {given} given")]
    InvalidArgument {
        method: String,
        expected: &'static str,
        given: String,
    },

    /// Raised from inside a user supplied callable.
    #[error("function failed: {0}")]
    Function(String),
}

impl QueryError {
    pub fn invalid_argument(
        method: impl Into<String>,
        expected: &'static str,
        given: impl Into<String>,
    ) -> Self {
        QueryError::InvalidArgument {
            method: method.into(),
            expected,
            given: given.into(),
        }
    }

    pub fn function(message: impl Into<String>) -> Self {
        QueryError::Function(message.into())
    }
}

impl From<LexError> for QueryError {
    fn from(e: LexError) -> Self {
        QueryError::SourceExtraction(SourceExtractionError::Lex(e))
    }
}
