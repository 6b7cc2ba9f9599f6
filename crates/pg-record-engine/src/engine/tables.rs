//! Schema-changing operations.
//!
//! This is the only place that issues DDL. Relation names arrive already
//! sanitized; column names are sanitized here.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::catalog::SchemaCatalog;
use crate::core::identifier::sanitize_identifier;
use crate::core::schema::{ColumnDef, RelationDescriptor, IDENTITY_COLUMN, PROTECTED_RELATION};
use crate::core::traits::RecordStore;
use crate::core::value::{Record, Value};
use crate::error::{EngineError, Result};
use crate::typemap::{infer_storage_type, parse_declared_type};

/// How the columns of a new relation are chosen.
#[derive(Debug, Clone, Default)]
pub enum RelationSpec {
    /// Identity column only.
    #[default]
    Bare,
    /// Caller-declared `(name, type)` pairs, in order.
    Columns(Vec<(String, String)>),
    /// Sample values; each column type is inferred.
    Sample(Record),
}

impl RelationSpec {
    /// Pick the mode from optional inputs. An explicit column list wins over
    /// a sample; with neither the relation is bare.
    pub fn from_parts(columns: Option<Vec<(String, String)>>, sample: Option<Record>) -> Self {
        match (columns, sample) {
            (Some(cols), _) => RelationSpec::Columns(cols),
            (None, Some(sample)) => RelationSpec::Sample(sample),
            (None, None) => RelationSpec::Bare,
        }
    }
}

/// Creates and drops relations and columns.
#[derive(Clone)]
pub struct TableManager {
    store: Arc<dyn RecordStore>,
    catalog: SchemaCatalog,
}

impl TableManager {
    pub fn new(store: Arc<dyn RecordStore>, catalog: SchemaCatalog) -> Self {
        Self { store, catalog }
    }

    /// Create a relation and return its live descriptor.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Conflict`] if the relation exists or two requested
    ///   columns sanitize to the same name
    /// - [`EngineError::Validation`] for an unusable column name or type
    pub async fn create_relation(
        &self,
        relation: &str,
        spec: RelationSpec,
    ) -> Result<RelationDescriptor> {
        if self.catalog.exists(relation).await? {
            return Err(EngineError::Conflict(format!(
                "relation '{}' already exists",
                relation
            )));
        }

        let columns = column_defs(spec)?;
        self.store.create_relation(relation, &columns).await?;
        info!(
            "Created relation {} with {} column(s)",
            relation,
            columns.len() + 1
        );

        self.catalog.describe(relation).await
    }

    /// Drop a relation if it exists.
    ///
    /// # Errors
    ///
    /// [`EngineError::Forbidden`] for the protected relation, whether or not
    /// it currently exists.
    pub async fn drop_relation(&self, relation: &str) -> Result<()> {
        if relation == PROTECTED_RELATION {
            return Err(EngineError::Forbidden(format!(
                "relation '{}' is protected and cannot be dropped",
                relation
            )));
        }

        self.store.drop_relation(relation).await?;
        info!("Dropped relation {}", relation);
        Ok(())
    }

    /// Add a column typed from `sample` and return the stored column name.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the relation is absent
    /// - [`EngineError::Conflict`] if the sanitized name is the identity
    ///   column or already exists
    pub async fn add_column(&self, relation: &str, requested: &str, sample: &Value) -> Result<String> {
        let name = sanitize_identifier(requested)?;
        let existing = self.catalog.require(relation).await?;

        if name == IDENTITY_COLUMN || existing.iter().any(|c| c.name == name) {
            return Err(EngineError::Conflict(format!(
                "column '{}' already exists in relation '{}'",
                name, relation
            )));
        }

        let storage = infer_storage_type(&name, sample);
        self.store
            .add_column(relation, &ColumnDef::new(&name, storage))
            .await?;
        info!("Added column {}.{} ({})", relation, name, storage);

        Ok(name)
    }

    /// Remove a column.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Forbidden`] for the identity column
    /// - [`EngineError::NotFound`] if the relation or column is absent
    pub async fn drop_column(&self, relation: &str, column: &str) -> Result<()> {
        let name = sanitize_identifier(column)?;
        if name == IDENTITY_COLUMN {
            return Err(EngineError::Forbidden(
                "the identity column cannot be dropped".into(),
            ));
        }

        let existing = self.catalog.require(relation).await?;
        if !existing.iter().any(|c| c.name == name) {
            return Err(EngineError::NotFound(format!(
                "column '{}' in relation '{}'",
                name, relation
            )));
        }

        self.store.drop_column(relation, &name).await?;
        info!("Dropped column {}.{}", relation, name);
        Ok(())
    }
}

/// Turn a spec into sanitized column definitions, identity excluded.
fn column_defs(spec: RelationSpec) -> Result<Vec<ColumnDef>> {
    let mut seen = HashSet::new();
    let mut defs = Vec::new();

    let mut push = |name: String, def: ColumnDef| -> Result<()> {
        if !seen.insert(name.clone()) {
            return Err(EngineError::Conflict(format!(
                "more than one requested column maps to '{}'",
                name
            )));
        }
        defs.push(def);
        Ok(())
    };

    match spec {
        RelationSpec::Bare => {}
        RelationSpec::Columns(columns) => {
            for (requested, declared) in columns {
                let name = sanitize_identifier(&requested)?;
                if name == IDENTITY_COLUMN {
                    debug!("Ignoring caller-supplied identity column '{}'", requested);
                    continue;
                }
                let column_type = parse_declared_type(&declared)?;
                push(name.clone(), ColumnDef::new(name, column_type))?;
            }
        }
        RelationSpec::Sample(sample) => {
            for (requested, value) in sample.iter() {
                let name = sanitize_identifier(requested)?;
                if name == IDENTITY_COLUMN {
                    debug!("Ignoring caller-supplied identity column '{}'", requested);
                    continue;
                }
                let storage = infer_storage_type(&name, value);
                push(name.clone(), ColumnDef::new(name, storage))?;
            }
        }
    }

    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnInfo, ColumnType, StorageType};
    use crate::drivers::memory::MemoryStore;

    fn manager() -> TableManager {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        TableManager::new(store.clone(), SchemaCatalog::new(store))
    }

    fn sample(fields: &[(&str, Value)]) -> Record {
        fields.iter().cloned().collect()
    }

    #[test]
    fn test_spec_precedence() {
        let cols = Some(vec![("a".to_string(), "text".to_string())]);
        let rec = Some(sample(&[("b", Value::Integer(1))]));
        assert!(matches!(
            RelationSpec::from_parts(cols, rec.clone()),
            RelationSpec::Columns(_)
        ));
        assert!(matches!(RelationSpec::from_parts(None, rec), RelationSpec::Sample(_)));
        assert!(matches!(RelationSpec::from_parts(None, None), RelationSpec::Bare));
    }

    #[test]
    fn test_column_defs_drop_identity_and_sanitize() {
        let defs = column_defs(RelationSpec::Columns(vec![
            ("ID".to_string(), "integer".to_string()),
            ("Full Name".to_string(), "varchar(80)".to_string()),
            ("seen_at".to_string(), "timestamp".to_string()),
        ]))
        .unwrap();
        assert_eq!(
            defs,
            vec![
                ColumnDef::new("full_name", StorageType::VarChar { length: 80 }),
                ColumnDef::new("seen_at", ColumnType::Declared("timestamp".into())),
            ]
        );
    }

    #[test]
    fn test_column_defs_reject_collisions() {
        let err = column_defs(RelationSpec::Sample(sample(&[
            ("first-name", "a".into()),
            ("firstname", "b".into()),
        ])))
        .unwrap_err();
        // "first-name" and "firstname" both become "firstname".
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn test_column_defs_reject_bad_declared_type() {
        let err = column_defs(RelationSpec::Columns(vec![(
            "a".to_string(),
            "text); drop table users; --".to_string(),
        )]))
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_from_sample() {
        let tables = manager();
        let desc = tables
            .create_relation(
                "events",
                RelationSpec::Sample(sample(&[
                    ("title", "hi".into()),
                    ("count", Value::Integer(3)),
                    ("active", Value::Bool(true)),
                ])),
            )
            .await
            .unwrap();

        assert_eq!(desc.name, "events");
        assert_eq!(
            desc.columns,
            vec![
                ColumnInfo::new("id", "integer"),
                ColumnInfo::new("title", "character varying"),
                ColumnInfo::new("count", "integer"),
                ColumnInfo::new("active", "boolean"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_existing_is_conflict() {
        let tables = manager();
        tables.create_relation("events", RelationSpec::Bare).await.unwrap();
        let err = tables
            .create_relation("events", RelationSpec::Bare)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_drop_protected_relation_is_forbidden() {
        let tables = manager();
        let err = tables.drop_relation("users").await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        tables.create_relation("users", RelationSpec::Bare).await.unwrap();
        let err = tables.drop_relation("users").await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_drop_missing_relation_succeeds() {
        assert!(manager().drop_relation("never_created").await.is_ok());
    }

    #[tokio::test]
    async fn test_add_column_returns_stored_name() {
        let tables = manager();
        tables.create_relation("events", RelationSpec::Bare).await.unwrap();

        let name = tables
            .add_column("events", "Contact Email!", &Value::from("x"))
            .await
            .unwrap();
        assert_eq!(name, "contact_email");

        let err = tables
            .add_column("events", "contact_email", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let err = tables.add_column("events", "ID", &Value::Null).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_column_missing_relation() {
        let err = manager()
            .add_column("nope", "title", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_drop_column_rules() {
        let tables = manager();
        tables
            .create_relation("events", RelationSpec::Sample(sample(&[("title", "x".into())])))
            .await
            .unwrap();

        assert!(matches!(
            tables.drop_column("events", "id").await.unwrap_err(),
            EngineError::Forbidden(_)
        ));
        assert!(matches!(
            tables.drop_column("events", "missing").await.unwrap_err(),
            EngineError::NotFound(_)
        ));
        tables.drop_column("events", "title").await.unwrap();
    }
}
