//! Relation and column metadata types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the server-assigned identity column every relation carries.
pub const IDENTITY_COLUMN: &str = "id";

/// The relation that can never be dropped.
pub const PROTECTED_RELATION: &str = "users";

/// Closed set of column types the engine creates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageType {
    /// Bounded string, `VARCHAR(n)`.
    VarChar { length: u32 },
    /// Unbounded text.
    Text,
    /// 32-bit integer.
    Integer,
    /// Fixed-point decimal.
    Decimal { precision: u8, scale: u8 },
    /// Boolean.
    Boolean,
}

impl StorageType {
    /// DDL spelling of the type.
    pub fn to_sql(&self) -> String {
        match self {
            StorageType::VarChar { length } => format!("VARCHAR({})", length),
            StorageType::Text => "TEXT".to_string(),
            StorageType::Integer => "INTEGER".to_string(),
            StorageType::Decimal { precision, scale } => {
                format!("DECIMAL({},{})", precision, scale)
            }
            StorageType::Boolean => "BOOLEAN".to_string(),
        }
    }

    /// Spelling reported by `information_schema.columns.data_type`.
    pub fn catalog_name(&self) -> &'static str {
        match self {
            StorageType::VarChar { .. } => "character varying",
            StorageType::Text => "text",
            StorageType::Integer => "integer",
            StorageType::Decimal { .. } => "numeric",
            StorageType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Type of a column about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// One of the engine's own storage types.
    Storage(StorageType),
    /// A caller-declared type outside the closed set, already screened.
    Declared(String),
}

impl ColumnType {
    /// DDL spelling of the type.
    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::Storage(t) => t.to_sql(),
            ColumnType::Declared(decl) => decl.clone(),
        }
    }

    /// Spelling a catalog would report for this type.
    pub fn catalog_name(&self) -> String {
        match self {
            ColumnType::Storage(t) => t.catalog_name().to_string(),
            ColumnType::Declared(decl) => decl.clone(),
        }
    }
}

impl From<StorageType> for ColumnType {
    fn from(t: StorageType) -> Self {
        ColumnType::Storage(t)
    }
}

/// A column to be created: sanitized name plus type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Sanitized column name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Live column metadata as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Data type as reported by the store's catalog.
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A relation and its columns in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Stored relation name.
    pub name: String,
    /// Columns, identity first.
    pub columns: Vec<ColumnInfo>,
}

impl RelationDescriptor {
    /// Column names in creation order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}
