//! The store seam.
//!
//! [`RecordStore`] is everything the engine needs from a SQL-capable store.
//! Each method maps to exactly one statement (or one catalog query); the
//! engine never asks a store to group them into a transaction.
//!
//! All relation and column names passed in are already sanitized by the
//! engine. Implementations still quote them before use.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{ColumnDef, ColumnInfo};
use super::value::Record;

/// Schema and row access for a relational store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine holds them as
/// `Arc<dyn RecordStore>` and may be shared across tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ===== Catalog =====

    /// Check if a relation exists.
    async fn relation_exists(&self, relation: &str) -> Result<bool>;

    /// List relations, ordered by name.
    async fn list_relations(&self) -> Result<Vec<String>>;

    /// List the columns of a relation in creation order.
    ///
    /// A missing relation yields an empty list.
    async fn list_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>>;

    // ===== Schema changes =====

    /// Create a relation. The identity column is always created first, ahead
    /// of `columns`.
    async fn create_relation(&self, relation: &str, columns: &[ColumnDef]) -> Result<()>;

    /// Drop a relation if it exists.
    async fn drop_relation(&self, relation: &str) -> Result<()>;

    /// Add one column to an existing relation.
    async fn add_column(&self, relation: &str, column: &ColumnDef) -> Result<()>;

    /// Remove one column from a relation.
    async fn drop_column(&self, relation: &str, column: &str) -> Result<()>;

    // ===== Rows =====

    /// Read every row, projecting `columns`, ordered by ascending identity.
    async fn select_all(&self, relation: &str, columns: &[ColumnInfo]) -> Result<Vec<Record>>;

    /// Read one row by identity.
    async fn select_by_id(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
    ) -> Result<Option<Record>>;

    /// Insert one row and return the identity the store assigned.
    ///
    /// `columns` is the live column list the values are written into; stores
    /// use it to convert values to the column types. `values` must not
    /// contain the identity column.
    async fn insert(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        values: &Record,
    ) -> Result<i64>;

    /// Update one row by identity. Returns the number of rows affected.
    async fn update(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
        values: &Record,
    ) -> Result<u64>;

    /// Delete one row by identity. Returns the number of rows affected.
    async fn delete(&self, relation: &str, id: i64) -> Result<u64>;

    // ===== Utility =====

    /// Round-trip to the store.
    async fn health_check(&self) -> Result<()>;

    /// Get the store type identifier (e.g., "postgres", "memory").
    fn store_type(&self) -> &str;

    /// Release connections.
    async fn close(&self);
}
