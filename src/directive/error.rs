//! Directive error types
//!
//! Syntax errors in directive lines and semantic errors in macro use.

use thiserror::Error;

/// Errors raised while reading directives
#[derive(Error, Debug, PartialEq)]
pub enum DirectiveError {
    /// The document's file kind cannot be determined
    #[error("Unknown document kind: {0}")]
    UnknownDocumentKind(String),

    /// A directive line is malformed
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A directive lacks its required argument list
    #[error("No {directive} argument given: {body}")]
    MissingArgument { directive: String, body: String },

    /// A `CONFIG` option name is not recognized
    #[error("Unknown CONFIG option '{0}'")]
    UnknownOption(String),

    /// A `CONFIG` option has an unusable value
    #[error("Invalid value '{value}' for CONFIG option '{key}'")]
    InvalidOption { key: String, value: String },

    /// A `DEFINE` block does not have the form `DEFINE name(p1, ...) body`
    #[error("Invalid macro definition: {0}")]
    InvalidMacroDefinition(String),

    /// A declared parameter never appears in the macro body
    #[error("Parameter '{parameter}' of macro '{name}' does not occur in its body")]
    UnusedParameter { name: String, parameter: String },

    /// A macro invocation names no defined macro
    #[error("Macro '{0}' is not defined")]
    UndefinedMacro(String),

    /// A macro invocation has the wrong number of arguments
    #[error("Macro '{name}' expects {expected} argument(s), got {found}")]
    MacroArity {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A macro expands (directly or indirectly) into itself
    #[error("Macro '{name}' expands into itself: {chain}")]
    RecursiveMacro { name: String, chain: String },

    /// A macro invocation has no closing parenthesis
    #[error("Unterminated invocation of macro '{0}'")]
    UnterminatedInvocation(String),
}

/// Result type for directive operations
pub type DirectiveResult<T> = Result<T, DirectiveError>;
