//! Error types for the runtime

use thiserror::Error;

use crate::value::{JsString, Value};

/// Source location information for error messages
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub file: JsString,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Conditions the virtual machine cannot recover from.
///
/// These never reach a script `catch` block; they unwind every frame and
/// surface to the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("call depth exceeded")]
    CallDepthExceeded,

    #[error("too many nested try blocks")]
    TryDepthExceeded,

    #[error("invalid jump address {0}")]
    InvalidJump(usize),
}

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum JsError {
    /// Parse or compile error
    #[error("SyntaxError: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    /// A script value in flight (`throw`, or a runtime error object)
    #[error("uncaught exception: {0:?}")]
    Thrown(Value),

    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>, file: &JsString, line: u32, column: u32) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation {
                file: file.clone(),
                line,
                column,
            },
        }
    }

    /// The thrown value, if this error is catchable by script code.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            JsError::Thrown(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, JsError::Fatal(_))
    }
}
