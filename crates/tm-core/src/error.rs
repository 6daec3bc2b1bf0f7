//! Error types for tm-core

use sipr_sip_msg::ParseError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised by the transaction and dialog core
#[derive(Error, Debug)]
pub enum TmError {
    /// A fixed-capacity table is full; nothing was modified
    #[error("Capacity exceeded: {what} is limited to {limit} entries")]
    CapacityExceeded { what: &'static str, limit: usize },

    /// A URI does not fit a branch slot; nothing was modified
    #[error("URI too long: {len} bytes (max {max})")]
    UriTooLong { len: usize, max: usize },

    /// Serialization wrote a different number of bytes than it computed
    #[error("Buffer size mismatch: computed {expected} bytes, wrote {written}")]
    BufferTooSmall { expected: usize, written: usize },

    /// A header required by the operation is absent
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// The shared or scratch arena is exhausted
    #[error("Memory exhausted: requested {requested} bytes, {available} available")]
    AllocationFailure { requested: usize, available: usize },

    /// A message or state transition that the protocol does not allow
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A header value could not be tokenized
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The transport refused a buffer
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No destination could be derived for a request
    #[error("No destination for {0}")]
    NoDestination(String),

    /// A reply or request matched no transaction
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for tm-core operations
pub type Result<T> = std::result::Result<T, TmError>;
