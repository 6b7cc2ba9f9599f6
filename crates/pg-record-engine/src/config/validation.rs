//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::drivers::common::SslMode;
use crate::error::{EngineError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;

    if db.host.is_empty() {
        return Err(EngineError::Config("database.host is required".into()));
    }
    if db.database.is_empty() {
        return Err(EngineError::Config("database.database is required".into()));
    }
    if db.user.is_empty() {
        return Err(EngineError::Config("database.user is required".into()));
    }
    if db.max_connections == 0 {
        return Err(EngineError::Config(
            "database.max_connections must be at least 1".into(),
        ));
    }
    if validate_identifier(&db.schema).is_err() {
        return Err(EngineError::Config(format!(
            "database.schema '{}' must be a lowercase identifier of [a-z0-9_]",
            db.schema
        )));
    }
    SslMode::parse(&db.ssl_mode)?;

    Ok(())
}
