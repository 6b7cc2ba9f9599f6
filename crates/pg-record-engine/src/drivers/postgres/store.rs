//! PostgreSQL-backed [`RecordStore`].
//!
//! One pooled connection per call, one statement per call. Failures from
//! tokio-postgres propagate unmodified as [`EngineError::Store`].

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Config as PgConfig, Row};
use tracing::{debug, info, warn};

use super::dialect::{PgDialect, Statement, LIST_COLUMNS_SQL, LIST_RELATIONS_SQL, RELATION_EXISTS_SQL};
use crate::config::DatabaseConfig;
use crate::core::schema::{ColumnDef, ColumnInfo};
use crate::core::traits::RecordStore;
use crate::core::value::{Record, Value};
use crate::drivers::common::TlsBuilder;
use crate::error::{EngineError, Result};

/// Connect timeout for new pool connections.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL store over a deadpool connection pool.
pub struct PgStore {
    pool: Pool,
    dialect: PgDialect,
}

impl PgStore {
    /// Create a pool from configuration and verify it with one round trip.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let tls = TlsBuilder::parse(&config.ssl_mode)?;
        let store =
            Self::from_pg_config(pg_config, &tls, &config.schema, config.max_connections).await?;

        info!("Connected to PostgreSQL: {}", config.endpoint());
        Ok(store)
    }

    /// Create a pool from an already-built tokio-postgres config.
    pub async fn from_pg_config(
        mut pg_config: PgConfig,
        tls: &TlsBuilder,
        schema: &str,
        max_connections: usize,
    ) -> Result<Self> {
        pg_config.keepalives(true);
        pg_config.connect_timeout(CONNECT_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match tls.build()? {
            Some(connector) => Manager::from_config(pg_config, connector, mgr_config),
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
        };

        let pool = Pool::builder(mgr)
            .max_size(max_connections)
            .build()
            .map_err(|e| EngineError::pool(e, "creating PostgreSQL pool"))?;

        let store = Self {
            pool,
            dialect: PgDialect::new(schema),
        };
        store.health_check().await?;
        Ok(store)
    }

    /// Schema the store operates in.
    pub fn schema(&self) -> &str {
        self.dialect.schema()
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| EngineError::pool(e, "getting PostgreSQL connection"))
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        debug!("{}", sql);
        let client = self.client().await?;
        client.execute(sql, &[]).await?;
        Ok(())
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64> {
        debug!("{}", stmt.sql);
        let client = self.client().await?;
        Ok(client.execute(stmt.sql.as_str(), &params(stmt)).await?)
    }
}

fn params(stmt: &Statement) -> Vec<&(dyn ToSql + Sync)> {
    stmt.params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl RecordStore for PgStore {
    async fn relation_exists(&self, relation: &str) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_one(RELATION_EXISTS_SQL, &[&self.schema(), &relation])
            .await?;
        Ok(row.get(0))
    }

    async fn list_relations(&self) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = client.query(LIST_RELATIONS_SQL, &[&self.schema()]).await?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn list_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        let client = self.client().await?;
        let rows = client
            .query(LIST_COLUMNS_SQL, &[&self.schema(), &relation])
            .await?;
        Ok(rows
            .iter()
            .map(|r| ColumnInfo::new(r.get::<_, String>(0), r.get::<_, String>(1)))
            .collect())
    }

    async fn create_relation(&self, relation: &str, columns: &[ColumnDef]) -> Result<()> {
        let sql = self.dialect.create_relation(relation, columns)?;
        self.execute_ddl(&sql).await
    }

    async fn drop_relation(&self, relation: &str) -> Result<()> {
        let sql = self.dialect.drop_relation(relation)?;
        self.execute_ddl(&sql).await
    }

    async fn add_column(&self, relation: &str, column: &ColumnDef) -> Result<()> {
        let sql = self.dialect.add_column(relation, column)?;
        self.execute_ddl(&sql).await
    }

    async fn drop_column(&self, relation: &str, column: &str) -> Result<()> {
        let sql = self.dialect.drop_column(relation, column)?;
        self.execute_ddl(&sql).await
    }

    async fn select_all(&self, relation: &str, columns: &[ColumnInfo]) -> Result<Vec<Record>> {
        let sql = self.dialect.select_all(relation, columns)?;
        debug!("{}", sql);
        let client = self.client().await?;
        let rows = client.query(sql.as_str(), &[]).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn select_by_id(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
    ) -> Result<Option<Record>> {
        let stmt = self.dialect.select_by_id(relation, columns, id)?;
        debug!("{}", stmt.sql);
        let client = self.client().await?;
        let row = client.query_opt(stmt.sql.as_str(), &params(&stmt)).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn insert(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        values: &Record,
    ) -> Result<i64> {
        let stmt = self.dialect.insert(relation, columns, values)?;
        debug!("{}", stmt.sql);
        let client = self.client().await?;
        let row = client.query_one(stmt.sql.as_str(), &params(&stmt)).await?;
        Ok(row.get(0))
    }

    async fn update(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
        values: &Record,
    ) -> Result<u64> {
        let stmt = self.dialect.update(relation, columns, id, values)?;
        self.execute(&stmt).await
    }

    async fn delete(&self, relation: &str, id: i64) -> Result<u64> {
        let stmt = self.dialect.delete(relation, id)?;
        self.execute(&stmt).await
    }

    async fn health_check(&self) -> Result<()> {
        let client = self.client().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn store_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Decode a row by its wire types. SQL NULLs are left out of the record.
fn decode_row(row: &Row) -> Result<Record> {
    let mut record = Record::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let value = match column.type_().name() {
            "bool" => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
            "int2" => row
                .try_get::<_, Option<i16>>(idx)?
                .map(|v| Value::Integer(v.into())),
            "int4" => row
                .try_get::<_, Option<i32>>(idx)?
                .map(|v| Value::Integer(v.into())),
            "int8" => row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer),
            "numeric" => row.try_get::<_, Option<Decimal>>(idx)?.map(Value::Decimal),
            "float4" => row
                .try_get::<_, Option<f32>>(idx)?
                .and_then(Decimal::from_f32)
                .map(Value::Decimal),
            "float8" => row
                .try_get::<_, Option<f64>>(idx)?
                .and_then(Decimal::from_f64)
                .map(Value::Decimal),
            _ => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
        };

        if let Some(value) = value {
            record.insert(column.name(), value);
        }
    }

    Ok(record)
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Integer(i) => i.to_sql(ty, out),
            Value::Decimal(d) => d.to_sql(ty, out),
            Value::Text(s) => s.as_str().to_sql(ty, out),
        }
    }

    // Placeholders carry explicit casts, so the server-side type always
    // matches the variant.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::drivers::common::SslMode;
    use crate::engine::{Engine, RelationSpec};
    use serde_json::json;

    const TEST_URL_VAR: &str = "PG_RECORD_ENGINE_TEST_URL";

    async fn test_store() -> PgStore {
        let url = std::env::var(TEST_URL_VAR).expect("PG_RECORD_ENGINE_TEST_URL must be set");
        let pg_config: PgConfig = url.parse().expect("valid PostgreSQL URL");
        PgStore::from_pg_config(pg_config, &TlsBuilder::new(SslMode::Disable), "public", 2)
            .await
            .expect("connect to test database")
    }

    #[test]
    fn test_value_to_sql_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap(),
            IsNull::Yes
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_value_to_sql_int8() {
        let mut buf = BytesMut::new();
        Value::Integer(258).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[tokio::test]
    #[ignore] // Requires PG_RECORD_ENGINE_TEST_URL
    async fn test_relation_lifecycle() {
        let store = test_store().await;
        let relation = "pgre_store_lifecycle";
        store.drop_relation(relation).await.unwrap();

        store
            .create_relation(
                relation,
                &[ColumnDef::new(
                    "title",
                    crate::core::schema::StorageType::VarChar { length: 255 },
                )],
            )
            .await
            .unwrap();
        assert!(store.relation_exists(relation).await.unwrap());

        let columns = store.list_columns(relation).await.unwrap();
        assert_eq!(columns[0], ColumnInfo::new("id", "integer"));
        assert_eq!(columns[1], ColumnInfo::new("title", "character varying"));

        let mut record = Record::new();
        record.insert("title", "hello");
        let id = store.insert(relation, &columns, &record).await.unwrap();

        let row = store
            .select_by_id(relation, &columns, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.id(), Some(id));
        assert_eq!(row.get("title"), Some(&Value::from("hello")));

        assert_eq!(store.delete(relation, id).await.unwrap(), 1);
        assert_eq!(store.delete(relation, id).await.unwrap(), 0);

        store.drop_relation(relation).await.unwrap();
        assert!(!store.relation_exists(relation).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires PG_RECORD_ENGINE_TEST_URL
    async fn test_null_columns_are_omitted() {
        let store = test_store().await;
        let relation = "pgre_store_nulls";
        store.drop_relation(relation).await.unwrap();
        store
            .create_relation(
                relation,
                &[
                    ColumnDef::new("note", crate::core::schema::StorageType::Text),
                    ColumnDef::new("flag", crate::core::schema::StorageType::Boolean),
                ],
            )
            .await
            .unwrap();

        let mut record = Record::new();
        record.insert("note", Value::Null);
        record.insert("flag", true);
        let columns = store.list_columns(relation).await.unwrap();
        let id = store.insert(relation, &columns, &record).await.unwrap();

        let rows = store.select_all(relation, &columns).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), Some(id));
        assert!(!rows[0].contains("note"));
        assert_eq!(rows[0].get("flag"), Some(&Value::Bool(true)));

        store.drop_relation(relation).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires PG_RECORD_ENGINE_TEST_URL
    async fn test_text_values_write_into_declared_types() {
        let engine = Engine::new(Arc::new(test_store().await));
        let relation = "pgre_store_declared";
        engine.drop_relation(relation).await.unwrap();
        engine
            .create_relation(
                relation,
                RelationSpec::Columns(vec![
                    ("seen_at".to_string(), "timestamp".to_string()),
                    ("d".to_string(), "date".to_string()),
                ]),
            )
            .await
            .unwrap();

        let created = engine
            .create_record(
                relation,
                Record::from_json(json!({"seen_at": "2024-01-01 00:00:00", "d": "2024-02-03"}))
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = created.id().unwrap();

        engine
            .update_record(relation, id, Record::from_json(json!({"d": "2024-03-04"})).unwrap())
            .await
            .unwrap();

        let row = engine.get_record(relation, id).await.unwrap();
        assert_eq!(row.get("seen_at"), Some(&Value::from("2024-01-01 00:00:00")));
        assert_eq!(row.get("d"), Some(&Value::from("2024-03-04")));

        engine.drop_relation(relation).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires PG_RECORD_ENGINE_TEST_URL
    async fn test_string_sample_into_name_typed_column() {
        let engine = Engine::new(Arc::new(test_store().await));
        let relation = "pgre_store_age";
        engine.drop_relation(relation).await.unwrap();
        engine.create_relation(relation, RelationSpec::Bare).await.unwrap();

        let created = engine
            .create_record(relation, Record::from_json(json!({"age": "30"})).unwrap())
            .await
            .unwrap();
        let id = created.id().unwrap();

        assert_eq!(
            engine.describe_relation(relation).await.unwrap().column("age"),
            Some(&ColumnInfo::new("age", "integer"))
        );
        let rows = engine.list_records(relation).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), Some(id));
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(30)));

        engine.drop_relation(relation).await.unwrap();
    }
}
