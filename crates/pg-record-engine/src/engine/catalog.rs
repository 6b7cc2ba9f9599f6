//! Live schema lookups.
//!
//! Nothing here is cached: each call is a fresh catalog round trip, so
//! concurrent and out-of-band schema changes are always observed.

use std::sync::Arc;

use crate::core::schema::{ColumnInfo, RelationDescriptor};
use crate::core::traits::RecordStore;
use crate::error::{EngineError, Result};

/// Read-only view over the store's catalog.
#[derive(Clone)]
pub struct SchemaCatalog {
    store: Arc<dyn RecordStore>,
}

impl SchemaCatalog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn exists(&self, relation: &str) -> Result<bool> {
        self.store.relation_exists(relation).await
    }

    pub async fn relations(&self) -> Result<Vec<String>> {
        self.store.list_relations().await
    }

    /// Columns in creation order, identity first. Empty for a missing relation.
    pub async fn columns(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        self.store.list_columns(relation).await
    }

    pub async fn column_exists(&self, relation: &str, column: &str) -> Result<bool> {
        Ok(self.columns(relation).await?.iter().any(|c| c.name == column))
    }

    /// Columns of a relation that must exist.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the relation is absent.
    pub async fn require(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        if !self.exists(relation).await? {
            return Err(EngineError::relation_not_found(relation));
        }
        self.columns(relation).await
    }

    /// Name and typed columns of a relation that must exist.
    pub async fn describe(&self, relation: &str) -> Result<RelationDescriptor> {
        Ok(RelationDescriptor {
            name: relation.to_string(),
            columns: self.require(relation).await?,
        })
    }
}
