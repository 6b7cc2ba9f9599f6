//! In-process [`RecordStore`].
//!
//! Holds relations in `RwLock`-guarded maps and hands out identities the way
//! a `SERIAL` column does: per relation, starting at 1, never reused. Used by
//! the engine tests and by embedders that run without a database.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::core::schema::{ColumnDef, ColumnInfo, IDENTITY_COLUMN};
use crate::core::traits::RecordStore;
use crate::core::value::{Record, Value};
use crate::error::{EngineError, Result};

#[derive(Debug, Default)]
struct MemRelation {
    columns: Vec<ColumnInfo>,
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

impl MemRelation {
    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn check_columns(&self, relation: &str, values: &Record) -> Result<()> {
        match values.keys().find(|k| !self.has_column(k)) {
            Some(missing) => Err(EngineError::Storage(format!(
                "column \"{}\" of relation \"{}\" does not exist",
                missing, relation
            ))),
            None => Ok(()),
        }
    }

    fn project(&self, row: &Record, columns: &[ColumnInfo]) -> Record {
        let names: Vec<&str> = if columns.is_empty() {
            self.columns.iter().map(|c| c.name.as_str()).collect()
        } else {
            columns.iter().map(|c| c.name.as_str()).collect()
        };

        names
            .into_iter()
            .filter_map(|name| match row.get(name) {
                Some(Value::Null) | None => None,
                Some(v) => Some((name, v.clone())),
            })
            .collect()
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    relations: RwLock<BTreeMap<String, MemRelation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, MemRelation>>> {
        self.relations
            .read()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, MemRelation>>> {
        self.relations
            .write()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".into()))
    }
}

fn missing_relation(relation: &str) -> EngineError {
    EngineError::Storage(format!("relation \"{}\" does not exist", relation))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn relation_exists(&self, relation: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(relation))
    }

    async fn list_relations(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn list_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .read()?
            .get(relation)
            .map(|r| r.columns.clone())
            .unwrap_or_default())
    }

    async fn create_relation(&self, relation: &str, columns: &[ColumnDef]) -> Result<()> {
        let mut relations = self.write()?;
        if relations.contains_key(relation) {
            return Err(EngineError::Storage(format!(
                "relation \"{}\" already exists",
                relation
            )));
        }

        let mut rel = MemRelation {
            next_id: 1,
            ..Default::default()
        };
        rel.columns.push(ColumnInfo::new(IDENTITY_COLUMN, "integer"));
        for col in columns {
            if rel.has_column(&col.name) {
                return Err(EngineError::Storage(format!(
                    "column \"{}\" specified more than once",
                    col.name
                )));
            }
            rel.columns
                .push(ColumnInfo::new(&col.name, col.column_type.catalog_name()));
        }

        relations.insert(relation.to_string(), rel);
        Ok(())
    }

    async fn drop_relation(&self, relation: &str) -> Result<()> {
        self.write()?.remove(relation);
        Ok(())
    }

    async fn add_column(&self, relation: &str, column: &ColumnDef) -> Result<()> {
        let mut relations = self.write()?;
        let rel = relations
            .get_mut(relation)
            .ok_or_else(|| missing_relation(relation))?;
        if rel.has_column(&column.name) {
            return Err(EngineError::Storage(format!(
                "column \"{}\" of relation \"{}\" already exists",
                column.name, relation
            )));
        }
        rel.columns
            .push(ColumnInfo::new(&column.name, column.column_type.catalog_name()));
        Ok(())
    }

    async fn drop_column(&self, relation: &str, column: &str) -> Result<()> {
        let mut relations = self.write()?;
        let rel = relations
            .get_mut(relation)
            .ok_or_else(|| missing_relation(relation))?;
        let pos = rel
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| {
                EngineError::Storage(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    column, relation
                ))
            })?;
        rel.columns.remove(pos);
        for row in rel.rows.values_mut() {
            row.remove(column);
        }
        Ok(())
    }

    async fn select_all(&self, relation: &str, columns: &[ColumnInfo]) -> Result<Vec<Record>> {
        let relations = self.read()?;
        let rel = relations
            .get(relation)
            .ok_or_else(|| missing_relation(relation))?;
        Ok(rel.rows.values().map(|row| rel.project(row, columns)).collect())
    }

    async fn select_by_id(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
    ) -> Result<Option<Record>> {
        let relations = self.read()?;
        let rel = relations
            .get(relation)
            .ok_or_else(|| missing_relation(relation))?;
        Ok(rel.rows.get(&id).map(|row| rel.project(row, columns)))
    }

    async fn insert(
        &self,
        relation: &str,
        _columns: &[ColumnInfo],
        values: &Record,
    ) -> Result<i64> {
        let mut relations = self.write()?;
        let rel = relations
            .get_mut(relation)
            .ok_or_else(|| missing_relation(relation))?;
        rel.check_columns(relation, values)?;

        let id = rel.next_id;
        rel.next_id += 1;

        let mut row = Record::with_capacity(values.len() + 1);
        row.insert(IDENTITY_COLUMN, id);
        for (name, value) in values.iter() {
            row.insert(name, value.clone());
        }
        rel.rows.insert(id, row);
        Ok(id)
    }

    async fn update(
        &self,
        relation: &str,
        _columns: &[ColumnInfo],
        id: i64,
        values: &Record,
    ) -> Result<u64> {
        let mut relations = self.write()?;
        let rel = relations
            .get_mut(relation)
            .ok_or_else(|| missing_relation(relation))?;
        rel.check_columns(relation, values)?;

        match rel.rows.get_mut(&id) {
            Some(row) => {
                for (name, value) in values.iter() {
                    row.insert(name, value.clone());
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, relation: &str, id: i64) -> Result<u64> {
        let mut relations = self.write()?;
        let rel = relations
            .get_mut(relation)
            .ok_or_else(|| missing_relation(relation))?;
        Ok(u64::from(rel.rows.remove(&id).is_some()))
    }

    async fn health_check(&self) -> Result<()> {
        self.read().map(|_| ())
    }

    fn store_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::StorageType;

    async fn store_with_events() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_relation(
                "events",
                &[
                    ColumnDef::new("title", StorageType::VarChar { length: 255 }),
                    ColumnDef::new("count", StorageType::Integer),
                ],
            )
            .await
            .unwrap();
        store
    }

    fn record(fields: &[(&str, Value)]) -> Record {
        fields.iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_identity_column_first() {
        let store = store_with_events().await;
        let columns = store.list_columns("events").await.unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnInfo::new("id", "integer"),
                ColumnInfo::new("title", "character varying"),
                ColumnInfo::new("count", "integer"),
            ]
        );
        assert!(store.list_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_relation_and_column_fail() {
        let store = store_with_events().await;
        assert!(store.create_relation("events", &[]).await.is_err());
        assert!(store
            .add_column("events", &ColumnDef::new("title", StorageType::Text))
            .await
            .is_err());
        assert!(store
            .add_column("missing", &ColumnDef::new("title", StorageType::Text))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_identities_are_never_reused() {
        let store = store_with_events().await;
        let a = store.insert("events", &[], &record(&[("title", "a".into())])).await.unwrap();
        let b = store.insert("events", &[], &record(&[("title", "b".into())])).await.unwrap();
        assert_eq!((a, b), (1, 2));

        assert_eq!(store.delete("events", b).await.unwrap(), 1);
        let c = store.insert("events", &[], &record(&[("title", "c".into())])).await.unwrap();
        assert_eq!(c, 3);
    }

    #[tokio::test]
    async fn test_select_omits_nulls_and_orders_by_id() {
        let store = store_with_events().await;
        store
            .insert("events", &[], &record(&[("title", "a".into()), ("count", Value::Null)]))
            .await
            .unwrap();
        store
            .insert("events", &[], &record(&[("count", 2i64.into())]))
            .await
            .unwrap();

        let columns = store.list_columns("events").await.unwrap();
        let rows = store.select_all("events", &columns).await.unwrap();
        assert_eq!(serde_json::to_string(&rows[0]).unwrap(), r#"{"id":1,"title":"a"}"#);
        assert_eq!(serde_json::to_string(&rows[1]).unwrap(), r#"{"id":2,"count":2}"#);
    }

    #[tokio::test]
    async fn test_unknown_column_write_fails() {
        let store = store_with_events().await;
        let err = store
            .insert("events", &[], &record(&[("nope", 1i64.into())]))
            .await
            .unwrap_err();
        assert!(err.is_store_error());
    }

    #[tokio::test]
    async fn test_update_and_delete_report_rows_affected() {
        let store = store_with_events().await;
        let id = store.insert("events", &[], &record(&[("title", "a".into())])).await.unwrap();

        assert_eq!(
            store.update("events", &[], id, &record(&[("title", "b".into())])).await.unwrap(),
            1
        );
        assert_eq!(
            store.update("events", &[], 99, &record(&[("title", "b".into())])).await.unwrap(),
            0
        );
        assert_eq!(store.delete("events", 99).await.unwrap(), 0);

        let row = store.select_by_id("events", &[], id).await.unwrap().unwrap();
        assert_eq!(row.get("title"), Some(&Value::from("b")));
    }

    #[tokio::test]
    async fn test_drop_column_removes_values() {
        let store = store_with_events().await;
        let id = store
            .insert("events", &[], &record(&[("title", "a".into()), ("count", 1i64.into())]))
            .await
            .unwrap();
        store.drop_column("events", "count").await.unwrap();
        assert!(store.drop_column("events", "count").await.is_err());

        let row = store.select_by_id("events", &[], id).await.unwrap().unwrap();
        assert!(!row.contains("count"));
    }
}
