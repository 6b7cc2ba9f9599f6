//! Generic CRUD over relations discovered at runtime.

use std::sync::Arc;

use tracing::{debug, warn};

use super::catalog::SchemaCatalog;
use super::tables::TableManager;
use super::validation::validate_payload;
use crate::core::identifier::sanitize;
use crate::core::schema::{ColumnInfo, IDENTITY_COLUMN};
use crate::core::traits::RecordStore;
use crate::core::value::{Record, Value};
use crate::error::{EngineError, Result};

/// Record operations over one store.
#[derive(Clone)]
pub struct RecordEngine {
    store: Arc<dyn RecordStore>,
    catalog: SchemaCatalog,
    tables: TableManager,
}

impl RecordEngine {
    pub fn new(store: Arc<dyn RecordStore>, catalog: SchemaCatalog, tables: TableManager) -> Self {
        Self {
            store,
            catalog,
            tables,
        }
    }

    /// Every row, ascending by identity.
    pub async fn list(&self, relation: &str) -> Result<Vec<Record>> {
        let columns = self.catalog.require(relation).await?;
        self.store.select_all(relation, &columns).await
    }

    /// One row by identity.
    pub async fn get(&self, relation: &str, id: i64) -> Result<Record> {
        let columns = self.catalog.require(relation).await?;
        self.store
            .select_by_id(relation, &columns, id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("record {} in relation '{}'", id, relation))
            })
    }

    /// Insert a row, growing the schema for unknown fields.
    ///
    /// Column additions are best-effort: a field whose column cannot be added
    /// is logged and left out of the row. Returns the identity followed by the
    /// fields that were written, under their stored column names.
    pub async fn create(&self, relation: &str, payload: Record) -> Result<Record> {
        let mut columns = self.catalog.require(relation).await?;
        validate_payload(&payload)?;

        let mut row = Record::with_capacity(payload.len());
        let mut evolved = false;
        for (key, value) in payload {
            let column = match resolve_column(&columns, &key) {
                Some(ColumnMatch::Identity) => continue,
                Some(ColumnMatch::Existing(name)) => name,
                None => match self.tables.add_column(relation, &key, &value).await {
                    Ok(name) => {
                        columns.push(ColumnInfo::new(&name, String::new()));
                        evolved = true;
                        name
                    }
                    Err(e) => {
                        warn!(
                            "Dropping field '{}' from insert into {}: {}",
                            key, relation, e
                        );
                        continue;
                    }
                },
            };

            if row.contains(&column) {
                debug!("Field '{}' maps onto already-written column {}", key, column);
                continue;
            }
            row.insert(column, value);
        }

        if row.is_empty() {
            return Err(EngineError::NoFields("insert"));
        }

        if evolved {
            columns = self.catalog.columns(relation).await?;
        }
        let id = self.store.insert(relation, &columns, &row).await?;
        debug!("Inserted record {} into {}", id, relation);

        let mut created = Record::with_capacity(row.len() + 1);
        created.insert(IDENTITY_COLUMN, Value::Integer(id));
        for (name, value) in row {
            created.insert(name, value);
        }
        Ok(created)
    }

    /// Update the fields of a row that already have columns.
    ///
    /// Never adds columns. Reports success whether or not a row matched.
    pub async fn update(&self, relation: &str, id: i64, payload: Record) -> Result<()> {
        let columns = self.catalog.require(relation).await?;
        validate_payload(&payload)?;

        let mut changes = Record::with_capacity(payload.len());
        for (key, value) in payload {
            if let Some(ColumnMatch::Existing(name)) = resolve_column(&columns, &key) {
                if !changes.contains(&name) {
                    changes.insert(name, value);
                }
            }
        }

        if changes.is_empty() {
            return Err(EngineError::NoFields("update"));
        }

        let affected = self.store.update(relation, &columns, id, &changes).await?;
        debug!("Updated record {} in {}: {} row(s) affected", id, relation, affected);
        Ok(())
    }

    /// Delete a row. Reports success whether or not a row matched.
    pub async fn delete(&self, relation: &str, id: i64) -> Result<()> {
        self.catalog.require(relation).await?;
        let affected = self.store.delete(relation, id).await?;
        debug!("Deleted record {} from {}: {} row(s) affected", id, relation, affected);
        Ok(())
    }
}

enum ColumnMatch {
    Identity,
    Existing(String),
}

/// Match a payload key against live columns, first verbatim, then sanitized.
fn resolve_column(columns: &[ColumnInfo], key: &str) -> Option<ColumnMatch> {
    let candidates = [key.to_string(), sanitize(key)];
    for candidate in candidates {
        if candidate == IDENTITY_COLUMN {
            return Some(ColumnMatch::Identity);
        }
        if columns.iter().any(|c| c.name == candidate) {
            return Some(ColumnMatch::Existing(candidate));
        }
    }
    None
}
