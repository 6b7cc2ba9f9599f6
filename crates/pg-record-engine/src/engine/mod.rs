//! The record engine.
//!
//! [`Engine`] is the public operation set. It owns a store handle, sanitizes
//! every relation name on the way in and delegates to:
//!
//! - [`SchemaCatalog`]: live existence and column lookups
//! - [`TableManager`]: relation and column DDL
//! - [`RecordEngine`]: list/get/create/update/delete with schema evolution
//!
//! No schema state is kept between calls.

mod catalog;
mod records;
mod tables;
mod validation;

pub use catalog::SchemaCatalog;
pub use records::RecordEngine;
pub use tables::{RelationSpec, TableManager};
pub use validation::{validate_payload, EMAIL_FIELD};

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::core::identifier::sanitize_identifier;
use crate::core::schema::{RelationDescriptor, PROTECTED_RELATION};
use crate::core::traits::RecordStore;
use crate::core::value::{Record, Value};
use crate::drivers::postgres::PgStore;
use crate::error::Result;

/// Outcome of [`Engine::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Store type identifier.
    pub store: String,
    pub connected: bool,
    /// Round-trip time in milliseconds.
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Schema-evolving record store over a [`RecordStore`].
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn RecordStore>,
    catalog: SchemaCatalog,
    tables: TableManager,
    records: RecordEngine,
    default_relations: Vec<String>,
}

impl Engine {
    /// Build an engine over an existing store handle.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let catalog = SchemaCatalog::new(store.clone());
        let tables = TableManager::new(store.clone(), catalog.clone());
        let records = RecordEngine::new(store.clone(), catalog.clone(), tables.clone());
        Self {
            store,
            catalog,
            tables,
            records,
            default_relations: vec![PROTECTED_RELATION.to_string()],
        }
    }

    /// Replace the relations [`bootstrap`](Self::bootstrap) ensures.
    pub fn with_default_relations(mut self, relations: Vec<String>) -> Self {
        self.default_relations = relations;
        self
    }

    /// Connect a PostgreSQL store from configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = PgStore::connect(&config.database).await?;
        Ok(Self::new(Arc::new(store))
            .with_default_relations(config.engine.default_relations.clone()))
    }

    pub fn store_type(&self) -> &str {
        self.store.store_type()
    }

    // ===== Relations =====

    pub async fn relation_exists(&self, name: &str) -> Result<bool> {
        let relation = sanitize_identifier(name)?;
        self.catalog.exists(&relation).await
    }

    pub async fn list_relations(&self) -> Result<Vec<String>> {
        self.catalog.relations().await
    }

    pub async fn create_relation(&self, name: &str, spec: RelationSpec) -> Result<RelationDescriptor> {
        let relation = sanitize_identifier(name)?;
        self.tables.create_relation(&relation, spec).await
    }

    pub async fn drop_relation(&self, name: &str) -> Result<()> {
        let relation = sanitize_identifier(name)?;
        self.tables.drop_relation(&relation).await
    }

    pub async fn describe_relation(&self, name: &str) -> Result<RelationDescriptor> {
        let relation = sanitize_identifier(name)?;
        self.catalog.describe(&relation).await
    }

    // ===== Columns =====

    pub async fn list_columns(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.describe_relation(name).await?.column_names())
    }

    pub async fn column_exists(&self, name: &str, column: &str) -> Result<bool> {
        let relation = sanitize_identifier(name)?;
        let column = sanitize_identifier(column)?;
        self.catalog.column_exists(&relation, &column).await
    }

    pub async fn add_column(&self, name: &str, column: &str, sample: &Value) -> Result<String> {
        let relation = sanitize_identifier(name)?;
        self.tables.add_column(&relation, column, sample).await
    }

    pub async fn drop_column(&self, name: &str, column: &str) -> Result<()> {
        let relation = sanitize_identifier(name)?;
        self.tables.drop_column(&relation, column).await
    }

    // ===== Records =====

    pub async fn list_records(&self, name: &str) -> Result<Vec<Record>> {
        let relation = sanitize_identifier(name)?;
        self.records.list(&relation).await
    }

    pub async fn get_record(&self, name: &str, id: i64) -> Result<Record> {
        let relation = sanitize_identifier(name)?;
        self.records.get(&relation, id).await
    }

    pub async fn create_record(&self, name: &str, payload: Record) -> Result<Record> {
        let relation = sanitize_identifier(name)?;
        self.records.create(&relation, payload).await
    }

    pub async fn update_record(&self, name: &str, id: i64, payload: Record) -> Result<()> {
        let relation = sanitize_identifier(name)?;
        self.records.update(&relation, id, payload).await
    }

    pub async fn delete_record(&self, name: &str, id: i64) -> Result<()> {
        let relation = sanitize_identifier(name)?;
        self.records.delete(&relation, id).await
    }

    // ===== Lifecycle =====

    /// Create any missing default relations as bare relations.
    ///
    /// Each relation is handled on its own; a failure is logged and the rest
    /// still run. Returns the relations that were created.
    pub async fn bootstrap(&self) -> Result<Vec<String>> {
        let mut created = Vec::new();

        for name in &self.default_relations {
            match self.ensure_relation(name).await {
                Ok(true) => {
                    info!("Created default relation {}", name);
                    created.push(name.clone());
                }
                Ok(false) => {}
                Err(e) => error!("Failed to ensure default relation {}: {}", name, e),
            }
        }

        Ok(created)
    }

    async fn ensure_relation(&self, name: &str) -> Result<bool> {
        if self.relation_exists(name).await? {
            return Ok(false);
        }
        self.create_relation(name, RelationSpec::Bare).await?;
        Ok(true)
    }

    /// Round-trip to the store and time it.
    pub async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let outcome = self.store.health_check().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        HealthReport {
            store: self.store.store_type().to_string(),
            connected: outcome.is_ok(),
            latency_ms,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Release store connections.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
