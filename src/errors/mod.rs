//! Error types for the migration pipeline
//!
//! Errors follow a three-tier taxonomy: record-level problems are never
//! represented here (mappers log and skip them), batch-level errors abort
//! the surrounding transaction, and run-level errors fail fast before any
//! write happens.

use std::path::PathBuf;

use thiserror::Error;

use crate::migrate::id_mapping::Namespace;

/// Top-level migration error type
///
/// Any variant escaping a mapper rolls back the whole run; there is no
/// partial-commit state.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Legacy input file could not be found
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Legacy input file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Legacy input document is not valid JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Datastore failures (connection, query, transaction control)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A mandatory legacy reference has no entry in the mapping directory
    #[error("No mapping found for {namespace} with legacy key: {legacy_key}")]
    MappingNotFound {
        namespace: Namespace,
        legacy_key: String,
    },

    /// Two legacy records claimed the same key in one namespace
    #[error(
        "Conflicting mapping for {namespace} key {legacy_key}: already mapped to {existing}, refusing to remap to {attempted}"
    )]
    MappingConflict {
        namespace: Namespace,
        legacy_key: String,
        existing: uuid::Uuid,
        attempted: uuid::Uuid,
    },

    /// A chunk exhausted its retry budget
    #[error("Batch {batch} failed after {attempts} attempts: {message}")]
    BatchExhausted {
        batch: usize,
        attempts: u32,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl MigrationError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for errors that occur before or outside the transactional
    /// region (nothing was written, nothing needs rolling back).
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            Self::InputNotFound { .. } | Self::Io(_) | Self::Json(_) | Self::Configuration { .. }
        )
    }
}
