use thiserror::Error;

/// Errors produced while scanning a message or tokenizing a header body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing to parse
    #[error("Empty input")]
    Empty,

    /// The request or status line is not well formed
    #[error("Invalid first line: {0}")]
    FirstLine(String),

    /// A header line has no name or no colon
    #[error("Malformed header line: {0}")]
    Header(String),

    /// A quoted string or angle bracket was opened but never closed
    #[error("Unterminated {0}")]
    Unterminated(&'static str),

    /// A header body could not be interpreted
    #[error("Invalid {header} value: {reason}")]
    InvalidValue {
        header: &'static str,
        reason: String,
    },
}

/// Result type for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;
