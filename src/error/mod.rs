//! Error types for all pipeline stages.

use crate::span::Span;
use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, Span),

    #[error("Unterminated string at {0}")]
    UnterminatedString(Span),

    #[error("Invalid escape sequence '\\{0}' at {1}")]
    InvalidEscape(char, Span),

    #[error("Invalid number '{0}' at {1}")]
    InvalidNumber(String, Span),
}

impl LexerError {
    pub fn unexpected_char(c: char, span: Span) -> Self {
        Self::UnexpectedChar(c, span)
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::UnterminatedString(span)
    }

    pub fn invalid_escape(c: char, span: Span) -> Self {
        Self::InvalidEscape(c, span)
    }

    pub fn invalid_number(s: impl Into<String>, span: Span) -> Self {
        Self::InvalidNumber(s.into(), span)
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar(_, span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::InvalidEscape(_, span) => *span,
            Self::InvalidNumber(_, span) => *span,
        }
    }
}

/// Parser errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    #[error("Unexpected token '{found}', expected {expected} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of file at {0}")]
    UnexpectedEof(Span),

    #[error("Invalid assignment target at {0}")]
    InvalidAssignmentTarget(Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof(span) => *span,
            Self::InvalidAssignmentTarget(span) => *span,
            Self::General { span, .. } => *span,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        Self::General {
            message: err.to_string(),
            span: err.span(),
        }
    }
}

/// Module resolution errors. A missing module is not one of them: it is
/// reported as a warning and the import is dropped.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("in module '{module}': {source}")]
    Parse {
        module: String,
        #[source]
        source: ParserError,
    },

    #[error("cannot read module '{module}': {source}")]
    Io {
        module: String,
        #[source]
        source: std::io::Error,
    },
}

/// Semantic analysis errors. The analyzer stops at the first one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Undefined identifier '{0}' at {1}")]
    UndefinedIdentifier(String, Span),

    #[error("Undefined class '{0}' at {1}")]
    UndefinedClass(String, Span),

    #[error("'{0}' is already declared in this scope at {1}")]
    Redeclaration(String, Span),

    #[error("Cannot assign to {kind} '{name}' at {span}")]
    InvalidAssignment {
        kind: String,
        name: String,
        span: Span,
    },

    #[error("Type mismatch: expected {expected}, found {found} at {span}")]
    Mismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Invalid operand types for '{op}': {left} and {right} at {span}")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("'{0}' is not a function at {1}")]
    NotCallable(String, Span),

    #[error("Wrong number of arguments to '{name}': expected {expected}, got {got} at {span}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl SemanticError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UndefinedIdentifier(_, span) => *span,
            Self::UndefinedClass(_, span) => *span,
            Self::Redeclaration(_, span) => *span,
            Self::InvalidAssignment { span, .. } => *span,
            Self::Mismatch { span, .. } => *span,
            Self::InvalidOperands { span, .. } => *span,
            Self::NotCallable(_, span) => *span,
            Self::WrongArity { span, .. } => *span,
            Self::General { span, .. } => *span,
        }
    }
}

/// Runtime errors raised by the virtual machine. All of them terminate the
/// running program; only an explicit `throw` can be caught.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Undefined label: {0}")]
    UndefinedLabel(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Unknown native call: {0}")]
    UnknownNative(String),

    #[error("{name} expects {expected} arguments but got {got}")]
    WrongArity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Stack overflow: more than {0} nested calls")]
    StackOverflow(usize),

    #[error("Method not found: {class}.{method}")]
    MethodNotFound { class: String, method: String },

    #[error("Cannot call method '{method}' on {type_name}")]
    InvalidReceiver { method: String, type_name: String },

    #[error("Invalid operands for {op}: {left} and {right}")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error("Invalid operand for {op}: {operand}")]
    InvalidOperand { op: String, operand: String },

    #[error("Div by zero")]
    DivisionByZero,

    #[error("Mod by zero")]
    ModuloByZero,

    #[error("Integer overflow")]
    IntegerOverflow,

    #[error("Index out of bounds: {index} (length {length})")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("{0}")]
    Type(String),

    #[error("{name}: {message}")]
    Native { name: String, message: String },

    #[error("Uncaught exception: {0}")]
    Uncaught(String),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn native(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum TernError {
    #[error("Parse error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Parse error: {0}")]
    Parser(#[from] ParserError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_messages_match_the_documented_wording() {
        assert_eq!(RuntimeError::DivisionByZero.to_string(), "Div by zero");
        assert_eq!(
            RuntimeError::FunctionNotFound("nope".into()).to_string(),
            "Function not found: nope"
        );
    }

    #[test]
    fn unified_error_prefixes_the_error_class() {
        let err: TernError = SemanticError::UndefinedIdentifier("x".into(), Span::default()).into();
        assert!(err.to_string().starts_with("Semantic error: "));
        let err: TernError = RuntimeError::StackUnderflow.into();
        assert_eq!(err.to_string(), "Runtime error: Stack underflow");
    }
}
