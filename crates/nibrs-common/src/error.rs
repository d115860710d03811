//! Error types for NIBRS ingestion

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for NIBRS operations
pub type Result<T> = std::result::Result<T, NibrsError>;

/// Main error type for NIBRS ingestion
///
/// Every variant here is fatal to a run. Faults scoped to a single line or a
/// single chunk are recovered where they happen and never become a
/// `NibrsError`.
#[derive(Error, Debug)]
pub enum NibrsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to open source {}: {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Table {table} exists but is missing columns: {}", missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NibrsError {
    /// Returns `true` if the error came from the destination store.
    pub fn is_destination(&self) -> bool {
        matches!(self, NibrsError::Database(_) | NibrsError::SchemaMismatch { .. })
    }
}
