//! Error types for devdb
//!
//! Error messages say which step failed and, where there is an obvious fix,
//! how to get past it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for devdb
#[derive(Error, Debug)]
pub enum Error {
    // === Container Engine Errors ===
    #[error("Failed to connect to the container engine at {socket}: {message}. Is the Podman socket running? Try 'systemctl --user start podman.socket'")]
    EngineConnectionFailed { socket: String, message: String },

    #[error("Container engine call '{operation}' failed: {message}")]
    Engine { operation: String, message: String },

    #[error("Failed to pull image '{image}': {message}")]
    ImagePull { image: String, message: String },

    #[error("Container '{container}' did not become healthy after {attempts} checks ({waited_secs}s)")]
    HealthTimeout {
        container: String,
        attempts: u32,
        waited_secs: u64,
    },

    #[error("Failed to prepare data directory '{path}': {error}")]
    DataDir { path: PathBuf, error: io::Error },

    // === Database Errors ===
    #[error("Failed to connect to database at {endpoint}: {message}")]
    DatabaseConnectionFailed { endpoint: String, message: String },

    #[error("Database {operation} failed: {message}")]
    Database { operation: String, message: String },

    #[error("Record {id} not found")]
    RecordNotFound { id: i64 },

    #[error("Expected at least {expected} records, found {found}")]
    UnexpectedRecordCount { expected: usize, found: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an engine connection error
    pub fn engine_connection_failed(socket: &str, message: impl ToString) -> Self {
        Self::EngineConnectionFailed {
            socket: socket.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an engine call failed error
    pub fn engine(operation: &str, message: impl ToString) -> Self {
        Self::Engine {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an image pull error
    pub fn image_pull(image: &str, message: impl ToString) -> Self {
        Self::ImagePull {
            image: image.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a database connection error
    pub fn database_connection_failed(endpoint: &str, message: impl ToString) -> Self {
        Self::DatabaseConnectionFailed {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a database operation error
    pub fn database(operation: &str, message: impl ToString) -> Self {
        Self::Database {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Short machine-readable code, logged when a command fails
    pub fn code(&self) -> &'static str {
        match self {
            Error::EngineConnectionFailed { .. } => "ENGINE_UNREACHABLE",
            Error::Engine { .. } => "ENGINE_CALL_FAILED",
            Error::ImagePull { .. } => "IMAGE_PULL_FAILED",
            Error::HealthTimeout { .. } => "HEALTH_TIMEOUT",
            Error::DataDir { .. } => "DATA_DIR",
            Error::DatabaseConnectionFailed { .. } => "DATABASE_UNREACHABLE",
            Error::Database { .. } => "DATABASE_FAILED",
            Error::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Error::UnexpectedRecordCount { .. } => "UNEXPECTED_RECORD_COUNT",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG",
            _ => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_connection_message_has_hint() {
        let err = Error::engine_connection_failed("/run/user/1000/podman/podman.sock", "refused");
        let msg = err.to_string();
        assert!(msg.contains("/run/user/1000/podman/podman.sock"));
        assert!(msg.contains("podman.socket"));
        assert_eq!(err.code(), "ENGINE_UNREACHABLE");
    }

    #[test]
    fn test_health_timeout_message() {
        let err = Error::HealthTimeout {
            container: "oracle-container".to_string(),
            attempts: 3,
            waited_secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "Container 'oracle-container' did not become healthy after 3 checks (30s)"
        );
    }

    #[test]
    fn test_codes_by_failure_class() {
        assert_eq!(Error::engine("start container", "x").code(), "ENGINE_CALL_FAILED");
        assert_eq!(Error::image_pull("img", "x").code(), "IMAGE_PULL_FAILED");
        assert_eq!(Error::database("delete", "x").code(), "DATABASE_FAILED");
        assert_eq!(
            Error::database_connection_failed("localhost:1521/FREEPDB1", "x").code(),
            "DATABASE_UNREACHABLE"
        );
        assert_eq!(Error::Config("bad".into()).code(), "CONFIG");
        assert_eq!(Error::Internal("bug".into()).code(), "INTERNAL_ERROR");
    }
}
