//! Mirror definitions.
//!
//! A [`MirrorDefinition`] describes one typed shadow table derived from a
//! metadata table, a value type and an optional key whitelist. The mirror
//! table name (which doubles as the mirror id) is derived once at
//! construction:
//!
//! ```text
//! wp_postmeta + VARCHAR(16)  ->  wp_postmeta_mm_varchar_16
//! wp_postmeta + INTEGER      ->  wp_postmeta_mm_integer
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MetaTableCatalog;
use crate::error::MirrorError;

/// Column types a mirror value can be stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    Integer,
    Varchar,
    Float,
    Decimal,
    Longtext,
    Bit,
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Integer,
        ValueType::Varchar,
        ValueType::Float,
        ValueType::Decimal,
        ValueType::Longtext,
        ValueType::Bit,
    ];

    /// The SQL keyword for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "INTEGER",
            ValueType::Varchar => "VARCHAR",
            ValueType::Float => "FLOAT",
            ValueType::Decimal => "DECIMAL",
            ValueType::Longtext => "LONGTEXT",
            ValueType::Bit => "BIT",
        }
    }

    /// Render the column type for the given precision/length arguments.
    pub fn column_definition(&self, args: &[u32]) -> String {
        match self {
            // MySQL rejects a VARCHAR without a length.
            ValueType::Varchar if args.is_empty() => "VARCHAR(255)".to_string(),
            ValueType::Longtext => "LONGTEXT".to_string(),
            _ if args.is_empty() => self.as_str().to_string(),
            _ => format!("{}({})", self.as_str(), join_args(args, ",")),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ValueType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| MirrorError::UnsupportedType {
                value_type: s.to_string(),
            })
    }
}

/// Identity of a registered mirror; equal to its mirror table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MirrorId(String);

impl MirrorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MirrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MirrorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MirrorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One typed shadow table of a metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorDefinition {
    id: MirrorId,
    source_table: String,
    mirror_table: String,
    id_column: String,
    object_id_column: String,
    key_column: String,
    value_column: String,
    value_type: ValueType,
    type_args: Vec<u32>,
    whitelist: Vec<String>,
}

impl MirrorDefinition {
    /// Define a mirror of `source_table` typed as `value_type`.
    pub fn new(
        catalog: &MetaTableCatalog,
        source_table: &str,
        value_type: ValueType,
        type_args: &[u32],
    ) -> Result<Self, MirrorError> {
        let table = catalog
            .get(source_table)
            .ok_or_else(|| MirrorError::UnsupportedTable {
                table: source_table.to_string(),
            })?;
        let columns = table.config;

        for ident in [
            source_table,
            columns.id_column.as_str(),
            columns.object_id_column.as_str(),
            columns.key_column.as_str(),
            columns.value_column.as_str(),
        ] {
            validate_identifier(ident)?;
        }

        let mut suffix = value_type.as_str().to_ascii_lowercase();
        if !type_args.is_empty() {
            suffix.push('_');
            suffix.push_str(&join_args(type_args, "_"));
        }
        let mirror_table = format!("{}{}_mm_{}", table.prefix, columns.name, suffix);
        validate_identifier(&mirror_table)?;

        Ok(Self {
            id: MirrorId(mirror_table.clone()),
            source_table: source_table.to_string(),
            mirror_table,
            id_column: columns.id_column.clone(),
            object_id_column: columns.object_id_column.clone(),
            key_column: columns.key_column.clone(),
            value_column: columns.value_column.clone(),
            value_type,
            type_args: type_args.to_vec(),
            whitelist: Vec::new(),
        })
    }

    /// Define a mirror from loosely typed input, as received from
    /// configuration files or host callers.
    ///
    /// The value type is matched case-insensitively. Type arguments that are
    /// empty or not non-negative integers are dropped.
    pub fn parse<I, S>(
        catalog: &MetaTableCatalog,
        source_table: &str,
        value_type: &str,
        type_args: I,
    ) -> Result<Self, MirrorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let value_type: ValueType = value_type.parse()?;
        let args: Vec<u32> = type_args
            .into_iter()
            .filter_map(|a| a.as_ref().trim().parse::<u32>().ok())
            .collect();
        Self::new(catalog, source_table, value_type, &args)
    }

    /// Whitelist another key pattern (SQL LIKE syntax).
    ///
    /// Only reachable for unregistered definitions or through the registry
    /// builder while the setup window is open.
    pub fn add_key(&mut self, like_pattern: &str) -> Result<(), MirrorError> {
        if like_pattern.trim().is_empty() {
            return Err(MirrorError::EmptyKeyPattern {
                mirror: self.id.to_string(),
            });
        }
        self.whitelist.push(like_pattern.to_string());
        Ok(())
    }

    /// Builder-style variant of [`add_key`](Self::add_key).
    pub fn with_key(mut self, like_pattern: &str) -> Result<Self, MirrorError> {
        self.add_key(like_pattern)?;
        Ok(self)
    }

    pub fn id(&self) -> &MirrorId {
        &self.id
    }

    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    pub fn mirror_table(&self) -> &str {
        &self.mirror_table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn object_id_column(&self) -> &str {
        &self.object_id_column
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn type_args(&self) -> &[u32] {
        &self.type_args
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    /// True when the mirror tracks every key.
    pub fn is_unfiltered(&self) -> bool {
        self.whitelist.is_empty()
    }

    /// The four mirrored columns, in table order.
    pub fn columns(&self) -> [&str; 4] {
        [
            &self.id_column,
            &self.object_id_column,
            &self.key_column,
            &self.value_column,
        ]
    }

    /// Column type of the value column.
    pub fn value_column_type(&self) -> String {
        self.value_type.column_definition(&self.type_args)
    }
}

/// Check that a name is safe to splice into generated SQL.
pub fn validate_identifier(ident: &str) -> Result<(), MirrorError> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        Ok(())
    } else {
        Err(MirrorError::InvalidIdentifier {
            ident: ident.to_string(),
        })
    }
}

fn join_args(args: &[u32], sep: &str) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
