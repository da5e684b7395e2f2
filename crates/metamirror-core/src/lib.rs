//! # metamirror-core
//!
//! Typed mirrors of generic key/value metadata tables.
//!
//! A metadata table stores rows of `(id, object_id, key, value)` with every
//! value kept as text. A mirror is a side table holding the same rows (or
//! the rows of a whitelisted set of keys) with the value column cast to a
//! real SQL type, so lookups by value can use the type and an index.
//!
//! This crate holds the pieces shared by the rest of the workspace:
//!
//! - [`MirrorDefinition`] and [`ValueType`]
//! - the two-phase registry ([`MirrorRegistryBuilder`] → [`CommittedRegistry`])
//!   gated by the host's [`SetupWindow`]
//! - YAML configuration ([`MetamirrorConfig`]) including the catalog of
//!   mirrorable tables
//!
//! ## Example
//!
//! ```
//! use metamirror_core::{MetaTableCatalog, MirrorRegistryBuilder, SetupWindow};
//!
//! let window = SetupWindow::open();
//! let mut builder = MirrorRegistryBuilder::new(MetaTableCatalog::default(), window.clone());
//!
//! let id = builder.register("wp_postmeta", "VARCHAR", ["16"]).unwrap();
//! builder.add_key(&id, "hello").unwrap();
//!
//! // The host signals that initialization is complete.
//! window.close();
//! assert!(builder.register("wp_usermeta", "INTEGER", [""; 0]).is_err());
//!
//! let registry = builder.finalize();
//! assert_eq!(registry.source_tables(), vec!["wp_postmeta"]);
//! ```

pub mod config;
pub mod error;
pub mod mirror;
pub mod registry;

pub use config::{
    ConfigError, DatabaseConfig, LogConfig, MetaTable, MetaTableCatalog, MetaTableConfig,
    MetamirrorConfig, MirrorDeclaration, TypeArg,
};
pub use error::MirrorError;
pub use mirror::{MirrorDefinition, MirrorId, ValueType, validate_identifier};
pub use registry::{CommittedRegistry, MirrorRegistryBuilder, SetupWindow};
