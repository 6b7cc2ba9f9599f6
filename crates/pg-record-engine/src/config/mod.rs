//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Short `host:port/database` label for logs. Never includes credentials.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
database:
  host: localhost
  database: records
  user: app
  password: secret
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.schema, "public");
        assert_eq!(config.database.ssl_mode, "require");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.engine.default_relations, vec!["users"]);
    }

    #[test]
    fn test_explicit_values() {
        let yaml = r#"
database:
  host: db.internal
  port: 6432
  database: records
  user: app
  password: secret
  schema: tenant_a
  ssl_mode: disable
  max_connections: 2
engine:
  default_relations: [users, audit]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.database.endpoint(), "db.internal:6432/records");
        assert_eq!(config.database.schema, "tenant_a");
        assert_eq!(config.engine.default_relations, vec!["users", "audit"]);
    }

    #[test]
    fn test_missing_section_is_yaml_error() {
        let err = Config::from_yaml("engine: {}\n").unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/pg-record-engine.yaml").unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Io(_)));
    }
}
