//! Error types for the SQL crate.

use thiserror::Error;

/// Errors raised by the parser.
///
/// Shapes the parser does not recognize are not errors: they only leave the
/// query partially parsed. The one construct it refuses outright is a
/// subquery, because skipping over it would hide table references.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SqlError {
    /// The query uses a construct the parser does not handle.
    #[error("not implemented: {construct}")]
    NotImplemented { construct: String },
}
