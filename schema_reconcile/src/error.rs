//! Error types for schema_reconcile

use thiserror::Error;

/// Result type for schema_reconcile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_reconcile
///
/// Detected drift is never an error: it is reported as a
/// [`Finding`](crate::plan::Finding). Errors are reserved for conditions that
/// stop a pass, a table, or a single repair.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("No datatype registered for {logical} on {dialect}")]
    UnregisteredDatatype { dialect: String, logical: String },

    #[error("Introspection error for table {table}: {message}")]
    IntrospectionError { table: String, message: String },

    #[error("Introspection unavailable: {0}")]
    IntrospectionUnavailable(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Whether this error aborts a whole reconciliation pass.
    ///
    /// Introspection failures scoped to one table and render failures scoped
    /// to one repair are not fatal; the engine records them and moves on.
    pub fn is_fatal_for_pass(&self) -> bool {
        !matches!(
            self,
            Error::IntrospectionError { .. } | Error::RenderError(_)
        )
    }
}

/// Convert Serde JSON errors to schema_reconcile errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_reconcile errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
