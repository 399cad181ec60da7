//! Error types for the object storage library.

use thiserror::Error;

/// Main error type for object storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A caller passed something the storage cannot accept (unregistered
    /// type, unknown field, identity re-assignment, mixed batch).
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// An operation was attempted on an object in the wrong lifecycle state
    /// (for example mutating a finalized builder).
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// A stored value does not have the type the caller asked for.
    #[error("Field '{field}' holds {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A database operation failed. Always names the storage operation, the
    /// affected type and the affected keys or objects.
    #[error("Database error when calling ObjectStorage::{operation}(...) with {{type={type_name}}}{subject}")]
    Storage {
        operation: &'static str,
        type_name: String,
        subject: String,
        #[source]
        source: Box<StorageError>,
    },

    /// Error reported by the sqlx driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error reported by an execution collaborator that is not sqlx backed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

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

impl StorageError {
    /// Create an IllegalArgument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        StorageError::IllegalArgument(message.into())
    }

    /// Create an IllegalState error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        StorageError::IllegalState(message.into())
    }

    /// Wrap an underlying failure with the operation, type and subject it
    /// happened on.
    pub fn storage(
        operation: &'static str,
        type_name: impl Into<String>,
        subject: impl Into<String>,
        source: StorageError,
    ) -> Self {
        StorageError::Storage {
            operation,
            type_name: type_name.into(),
            subject: subject.into(),
            source: Box::new(source),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            StorageError::Config(_) | StorageError::Yaml(_) | StorageError::Json(_) => 1,
            StorageError::IllegalArgument(_) | StorageError::TypeMismatch { .. } => 2,
            StorageError::IllegalState(_) => 3,
            StorageError::Storage { .. }
            | StorageError::Database(_)
            | StorageError::Execution(_) => 4,
            StorageError::Io(_) => 7,
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

/// Result type alias for object storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
