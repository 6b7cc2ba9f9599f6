//! PostgreSQL driver.
//!
//! - [`PgDialect`]: statement text for one schema
//! - [`PgStore`]: the pooled [`RecordStore`](crate::core::RecordStore) implementation

mod dialect;
mod store;

pub use dialect::{PgDialect, Statement};
pub use store::PgStore;
