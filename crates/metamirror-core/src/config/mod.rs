//! Configuration types for metamirror.
//!
//! A single YAML file (`metamirror.yaml` by convention) describes the
//! database connection, the catalog of mirrorable metadata tables and the
//! mirrors to maintain:
//!
//! ```yaml
//! database:
//!   host: localhost
//!   database: wordpress
//!   credentials_env: DATABASE_URL
//! catalog:
//!   table_prefix: wp_
//! mirrors:
//!   - table: wp_postmeta
//!     type: VARCHAR
//!     args: [16]
//!     keys: ["hello"]
//!   - table: wp_postmeta
//!     type: INTEGER
//!     keys: ["bye"]
//! ```

pub mod catalog;
pub mod database;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

pub use catalog::{MetaTable, MetaTableCatalog, MetaTableConfig};
pub use database::DatabaseConfig;

use crate::error::MirrorError;
use crate::registry::{MirrorRegistryBuilder, SetupWindow};

/// Complete metamirror configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetamirrorConfig {
    /// Store connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Mirrorable tables and their column layout.
    #[serde(default)]
    pub catalog: MetaTableCatalog,

    /// Declared mirrors, registered in file order.
    #[serde(default)]
    pub mirrors: Vec<MirrorDeclaration>,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// One mirror as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorDeclaration {
    /// Source metadata table (with host prefix).
    pub table: String,

    /// Value type name (INTEGER, VARCHAR, FLOAT, DECIMAL, LONGTEXT, BIT).
    #[serde(rename = "type")]
    pub value_type: String,

    /// Precision/length arguments.
    #[serde(default)]
    pub args: Vec<TypeArg>,

    /// Whitelisted key patterns (SQL LIKE syntax). Empty mirrors every key.
    #[serde(default)]
    pub keys: Vec<String>,
}

/// A type argument as written in YAML: `16` and `"16"` are both accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeArg {
    Int(i64),
    Text(String),
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Int(n) => write!(f, "{}", n),
            TypeArg::Text(s) => f.write_str(s),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetamirrorConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.tables.is_empty() {
            return Err(ConfigError::Config(
                "catalog must list at least one metadata table".to_string(),
            ));
        }
        for table in &self.catalog.tables {
            if table.name.trim().is_empty() {
                return Err(ConfigError::Config(
                    "catalog table name cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Register every declared mirror into a fresh builder.
    ///
    /// Stops at the first declaration that fails; the error names the
    /// offending mirror or table.
    pub fn registry_builder(
        &self,
        window: SetupWindow,
    ) -> Result<MirrorRegistryBuilder, MirrorError> {
        let mut builder = MirrorRegistryBuilder::new(self.catalog.clone(), window);

        for declaration in &self.mirrors {
            let args: Vec<String> = declaration.args.iter().map(|a| a.to_string()).collect();
            let id = builder.register(&declaration.table, &declaration.value_type, &args)?;
            for key in &declaration.keys {
                builder.add_key(&id, key)?;
            }
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
database:
  host: db.internal
  database: site
catalog:
  table_prefix: wp_
mirrors:
  - table: wp_postmeta
    type: VARCHAR
    args: [16]
    keys: ["hello"]
  - table: wp_postmeta
    type: integer
    args: ["", "x"]
    keys: ["bye", "count_%"]
log:
  level: debug
"#;

    #[test]
    fn test_from_yaml() {
        let config = MetamirrorConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.catalog.tables.len(), 4);
        assert_eq!(config.mirrors.len(), 2);
        assert_eq!(config.mirrors[0].args, vec![TypeArg::Int(16)]);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_registry_builder_from_declarations() {
        let config = MetamirrorConfig::from_yaml(SAMPLE).unwrap();
        let registry = config.registry_builder(SetupWindow::open()).unwrap().finalize();

        let mirrors: Vec<(&str, &[String])> = registry
            .iter()
            .map(|m| (m.mirror_table(), m.whitelist()))
            .collect();
        assert_eq!(
            mirrors,
            vec![
                ("wp_postmeta_mm_varchar_16", &["hello".to_string()][..]),
                (
                    "wp_postmeta_mm_integer",
                    &["bye".to_string(), "count_%".to_string()][..]
                ),
            ]
        );
    }

    #[test]
    fn test_duplicate_declarations_rejected() {
        let yaml = r#"
mirrors:
  - { table: wp_postmeta, type: INTEGER }
  - { table: wp_postmeta, type: INTEGER, keys: [a] }
"#;
        let config = MetamirrorConfig::from_yaml(yaml).unwrap();
        let err = config.registry_builder(SetupWindow::open()).unwrap_err();
        assert!(matches!(err, MirrorError::DuplicateMirror { .. }));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let err = MetamirrorConfig::from_yaml("catalog:\n  tables: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = MetamirrorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.database, "site");

        assert!(matches!(
            MetamirrorConfig::from_file(file.path().with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
