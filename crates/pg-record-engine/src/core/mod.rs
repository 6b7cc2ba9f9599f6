//! Core abstractions shared by the engine and the store drivers.
//!
//! - [`identifier`]: sanitizing and quoting caller-supplied names
//! - [`schema`]: relation, column and storage type metadata
//! - [`value`]: the closed scalar value set and ordered records
//! - [`traits`]: the [`RecordStore`] seam implemented by drivers

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    ColumnDef, ColumnInfo, ColumnType, RelationDescriptor, StorageType, IDENTITY_COLUMN,
    PROTECTED_RELATION,
};
pub use traits::RecordStore;
pub use value::{Record, Value};
