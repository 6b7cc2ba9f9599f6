//! Store drivers.
//!
//! - [`postgres`]: the production store, pooled tokio-postgres
//! - [`memory`]: an in-process store with the same failure modes
//! - [`common`]: shared connection helpers (TLS)

pub mod common;
pub mod memory;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use memory::MemoryStore;
pub use postgres::{PgDialect, PgStore};
