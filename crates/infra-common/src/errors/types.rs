use thiserror::Error;

/// Errors raised while bootstrapping logging or loading configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A global tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for infra-common operations
pub type Result<T> = std::result::Result<T, Error>;
