//! # pg-record-engine
//!
//! Schema-evolving generic record store on top of PostgreSQL.
//!
//! Callers create relations without declaring a schema up front, write
//! arbitrary key-value payloads, and the engine infers column types and grows
//! the schema as new fields appear:
//!
//! - **Type inference** from column names and sample values
//! - **Schema evolution on write**: unknown fields become new columns
//! - **Safe statements**: sanitized, quoted identifiers and bound values
//! - **Live catalog**: no schema state is cached between calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_record_engine::{Config, Engine, Record, RelationSpec};
//!
//! #[tokio::main]
//! async fn main() -> pg_record_engine::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let engine = Engine::connect(&config).await?;
//!     engine.bootstrap().await?;
//!
//!     engine.create_relation("events", RelationSpec::Bare).await?;
//!     let record = Record::from_json_str(r#"{"title": "launch", "attendees": 40}"#)?;
//!     let created = engine.create_record("events", record).await?;
//!     println!("{}", serde_json::to_string(&created)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, EngineConfig};
pub use crate::core::{ColumnInfo, RecordStore, Record, RelationDescriptor, StorageType, Value};
pub use drivers::{MemoryStore, PgStore};
pub use engine::{Engine, HealthReport, RelationSpec};
pub use error::{EngineError, Result};
