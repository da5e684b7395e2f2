//! Catalog of mirrorable metadata tables.
//!
//! The host application decides which of its key/value tables may be
//! mirrored and what their row-identity and owning-object columns are
//! called. This module carries that knowledge as configuration, with the
//! WordPress meta tables as the default.

use serde::{Deserialize, Serialize};

/// The set of metadata tables that may be mirrored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaTableCatalog {
    /// Host table prefix, prepended to every table name below.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Mirrorable tables, named without the host prefix.
    #[serde(default = "default_tables")]
    pub tables: Vec<MetaTableConfig>,
}

impl Default for MetaTableCatalog {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            tables: default_tables(),
        }
    }
}

/// Column layout of one metadata table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaTableConfig {
    /// Table name without the host prefix (e.g. `postmeta`).
    pub name: String,

    /// Row identity column.
    pub id_column: String,

    /// Owning object column.
    pub object_id_column: String,

    #[serde(default = "default_key_column")]
    pub key_column: String,

    #[serde(default = "default_value_column")]
    pub value_column: String,
}

impl MetaTableConfig {
    /// Create a table layout with the default key/value column names.
    pub fn new(
        name: impl Into<String>,
        id_column: impl Into<String>,
        object_id_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id_column: id_column.into(),
            object_id_column: object_id_column.into(),
            key_column: default_key_column(),
            value_column: default_value_column(),
        }
    }
}

/// A catalog entry resolved against the host prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaTable<'a> {
    pub prefix: &'a str,
    pub config: &'a MetaTableConfig,
}

impl MetaTable<'_> {
    /// The physical table name, prefix included.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.prefix, self.config.name)
    }
}

impl MetaTableCatalog {
    /// Create an empty catalog with the given prefix.
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table to the catalog.
    pub fn with_table(mut self, table: MetaTableConfig) -> Self {
        self.tables.push(table);
        self
    }

    /// Look up a table by its physical (prefixed) name.
    pub fn get(&self, full_name: &str) -> Option<MetaTable<'_>> {
        let base = full_name.strip_prefix(self.table_prefix.as_str())?;
        self.tables
            .iter()
            .find(|t| t.name == base)
            .map(|config| MetaTable {
                prefix: &self.table_prefix,
                config,
            })
    }

    /// Physical names of every mirrorable table.
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| format!("{}{}", self.table_prefix, t.name))
            .collect()
    }
}

fn default_table_prefix() -> String {
    "wp_".to_string()
}

fn default_key_column() -> String {
    "meta_key".to_string()
}

fn default_value_column() -> String {
    "meta_value".to_string()
}

fn default_tables() -> Vec<MetaTableConfig> {
    vec![
        MetaTableConfig::new("postmeta", "meta_id", "post_id"),
        MetaTableConfig::new("termmeta", "meta_id", "term_id"),
        MetaTableConfig::new("commentmeta", "meta_id", "comment_id"),
        MetaTableConfig::new("usermeta", "umeta_id", "user_id"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_columns() {
        let catalog = MetaTableCatalog::default();

        let postmeta = catalog.get("wp_postmeta").unwrap();
        assert_eq!(postmeta.config.id_column, "meta_id");
        assert_eq!(postmeta.config.object_id_column, "post_id");
        assert_eq!(postmeta.config.key_column, "meta_key");
        assert_eq!(postmeta.config.value_column, "meta_value");

        let usermeta = catalog.get("wp_usermeta").unwrap();
        assert_eq!(usermeta.config.id_column, "umeta_id");
        assert_eq!(usermeta.config.object_id_column, "user_id");
    }

    #[test]
    fn test_lookup_requires_prefix() {
        let catalog = MetaTableCatalog::default();
        assert!(catalog.get("postmeta").is_none());
        assert!(catalog.get("wp_posts").is_none());
        assert!(catalog.get("xx_postmeta").is_none());
    }

    #[test]
    fn test_custom_catalog_from_yaml() {
        let yaml = r#"
table_prefix: shop_
tables:
  - name: ordermeta
    id_column: id
    object_id_column: order_id
"#;
        let catalog: MetaTableCatalog = serde_yaml::from_str(yaml).unwrap();
        let table = catalog.get("shop_ordermeta").unwrap();
        assert_eq!(table.full_name(), "shop_ordermeta");
        assert_eq!(table.config.key_column, "meta_key");
        assert_eq!(catalog.table_names(), vec!["shop_ordermeta".to_string()]);
    }
}
