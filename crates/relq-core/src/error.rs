//! Engine error types.

use thiserror::Error;

/// Errors raised by the mapping engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or ambiguous declarative metadata, surfaced at first use of the
    /// offending type.
    #[error("schema error: {0}")]
    Schema(String),

    /// A predicate or projection shape the resolver cannot translate.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Misuse of the query-builder state machine.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Opaque pass-through from the underlying driver.
    #[error("database error: {0}")]
    Database(String),
}
