//! Error types for the record engine.

use thiserror::Error;

/// Process exit codes reported by hosts (the CLI) for each error class.
pub const EXIT_CONFIG_ERROR: u8 = 1;
pub const EXIT_STORE_ERROR: u8 = 2;
pub const EXIT_NOT_FOUND: u8 = 3;
pub const EXIT_INVALID_INPUT: u8 = 4;
pub const EXIT_CONFLICT: u8 = 5;
pub const EXIT_FORBIDDEN: u8 = 6;
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A relation or record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload or identifier failed a domain rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Relation or column already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation is never allowed on the target (protected relation, identity column).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Write payload had nothing that maps onto the relation's columns.
    #[error("No valid fields to {0}")]
    NoFields(&'static str),

    /// PostgreSQL statement or connection failure, propagated unmodified.
    #[error("Store error: {0}")]
    Store(#[from] tokio_postgres::Error),

    /// Failure reported by a non-PostgreSQL store implementation.
    #[error("Store error: {0}")]
    Storage(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        EngineError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a NotFound error for a relation.
    pub fn relation_not_found(relation: &str) -> Self {
        EngineError::NotFound(format!("relation '{}'", relation))
    }

    /// Whether this error came from the underlying store rather than a domain rule.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            EngineError::Store(_) | EngineError::Storage(_) | EngineError::Pool { .. }
        )
    }

    /// Exit code a host process should report for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Config(_) | EngineError::Yaml(_) => EXIT_CONFIG_ERROR,
            EngineError::Store(_) | EngineError::Storage(_) | EngineError::Pool { .. } => {
                EXIT_STORE_ERROR
            }
            EngineError::NotFound(_) => EXIT_NOT_FOUND,
            EngineError::Validation(_) | EngineError::NoFields(_) | EngineError::Json(_) => {
                EXIT_INVALID_INPUT
            }
            EngineError::Conflict(_) => EXIT_CONFLICT,
            EngineError::Forbidden(_) => EXIT_FORBIDDEN,
            EngineError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
