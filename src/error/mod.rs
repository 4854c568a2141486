//! Error handling and diagnostics for the PLC language
//!
//! Every pipeline stage fails fast with a single `PlcError`. The error
//! carries the stage it came from, a specific kind for that stage and,
//! where one is known, the source location of the failure.

use std::fmt;

pub mod diagnostic;

pub use diagnostic::Diagnostic;

/// Result type alias for PLC operations
pub type PlcResult<T> = Result<T, PlcError>;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Character offset into the source text (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Location `count` characters to the right on the same line
    pub fn advanced(&self, count: usize) -> Self {
        Self::new(self.offset + count, self.line, self.column + count)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Lexer failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    EmptyCharacterLiteral,
    InvalidCharacterLiteral,
    InvalidEscape,
    UnterminatedString,
}

/// Analyzer failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    UndefinedName,
    UnknownType,
    ArityMismatch,
    TypeMismatch,
    ArgumentTypeMismatch,
    OutOfRange,
    MissingMain,
    NonCallExpressionStatement,
    EmptyStatementBlock,
    InvalidGroup,
    UntypedDeclaration,
    InvalidAssignmentTarget,
}

/// Interpreter failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedName,
    DivisionByZero,
    NotComparable,
    OperandTypeMismatch,
    InvalidAssignmentTarget,
    NotCallable,
    Output,
}

/// Main error type for the PLC language
#[derive(Debug, Clone, PartialEq)]
pub enum PlcError {
    /// Lexical analysis error
    LexError {
        kind: LexErrorKind,
        message: String,
        location: SourceLocation,
    },
    /// Parsing error
    ParseError {
        message: String,
        location: SourceLocation,
    },
    /// Static analysis error
    TypeError {
        kind: TypeErrorKind,
        message: String,
        location: Option<SourceLocation>,
    },
    /// Runtime error
    RuntimeError {
        kind: RuntimeErrorKind,
        message: String,
        location: Option<SourceLocation>,
    },
}

impl PlcError {
    /// Create a new lexer error
    pub fn lex_error(
        kind: LexErrorKind,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self::LexError {
            kind,
            message: message.into(),
            location,
        }
    }

    /// Create a new parse error
    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }

    /// Create a new type error
    pub fn type_error(
        kind: TypeErrorKind,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self::TypeError {
            kind,
            message: message.into(),
            location,
        }
    }

    /// Create a new runtime error
    pub fn runtime_error(
        kind: RuntimeErrorKind,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self::RuntimeError {
            kind,
            message: message.into(),
            location,
        }
    }

    /// Get the error kind as a string
    pub fn kind(&self) -> &str {
        match self {
            Self::LexError { .. } => "Lex Error",
            Self::ParseError { .. } => "Parse Error",
            Self::TypeError { .. } => "Type Error",
            Self::RuntimeError { .. } => "Runtime Error",
        }
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::LexError { message, .. }
            | Self::ParseError { message, .. }
            | Self::TypeError { message, .. }
            | Self::RuntimeError { message, .. } => message,
        }
    }

    /// Get the source location if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::LexError { location, .. } | Self::ParseError { location, .. } => Some(location),
            Self::TypeError { location, .. } | Self::RuntimeError { location, .. } => {
                location.as_ref()
            }
        }
    }

    /// Attach a location to an error that was raised without one
    pub fn or_at(self, at: SourceLocation) -> Self {
        match self {
            Self::TypeError {
                kind,
                message,
                location: None,
            } => Self::TypeError {
                kind,
                message,
                location: Some(at),
            },
            Self::RuntimeError {
                kind,
                message,
                location: None,
            } => Self::RuntimeError {
                kind,
                message,
                location: Some(at),
            },
            other => other,
        }
    }
}

impl fmt::Display for PlcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = self.location() {
            write!(f, "{}: {} at {}", self.kind(), self.message(), location)
        } else {
            write!(f, "{}: {}", self.kind(), self.message())
        }
    }
}

impl std::error::Error for PlcError {}
