//! Error types for mirror registration.

use thiserror::Error;

/// Errors raised while defining or registering mirrors.
///
/// Every variant is raised before the registry is modified, so a failed call
/// never leaves a partially registered mirror behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    /// The source table is not in the catalog of mirrorable tables.
    #[error("mirroring of table `{table}` is not supported")]
    UnsupportedTable { table: String },

    /// The value type is not one of the supported column types.
    #[error("value type `{value_type}` is not supported")]
    UnsupportedType { value_type: String },

    /// An empty key pattern was added to a whitelist.
    #[error("key pattern for mirror {mirror} cannot be empty")]
    EmptyKeyPattern { mirror: String },

    /// Registration attempted after the setup window closed.
    #[error("{operation} is only allowed while the setup window is open")]
    LifecycleViolation { operation: String },

    /// A mirror with the same id is already registered.
    #[error("mirror {id} already exists; whitelist additional keys instead")]
    DuplicateMirror { id: String },

    /// No mirror with this id is registered.
    #[error("mirror {id} is not registered")]
    UnknownMirror { id: String },

    /// A table or column name cannot be used as a SQL identifier.
    #[error("invalid identifier `{ident}`")]
    InvalidIdentifier { ident: String },
}
