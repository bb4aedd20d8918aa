//! Error types for the gradeload pipeline.
//!
//! - [`SheetError`] - the uploaded file cannot be read as a table
//! - [`SchemaError`] - the table does not have the 9-column layout
//! - [`WriteError`] - an artifact could not be persisted
//! - [`PipelineError`] - top-level run failure
//! - [`ConfigError`] - invalid environment configuration
//! - [`ServerError`] - HTTP layer failures
//!
//! Conversion is via `From`, so `?` works across layers.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Sheet Reading Errors
// =============================================================================

/// Errors while decoding an input file into raw rows.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook could not be decoded.
    #[error("Invalid workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// Delimited text could not be decoded.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Extension is not a known spreadsheet dialect.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Workbook has no worksheet to read.
    #[error("Workbook contains no worksheet")]
    NoWorksheet,
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while mapping raw rows onto canonical records.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// A row does not have exactly the canonical number of fields.
    #[error("Row {row} has {found} columns, expected {expected}")]
    WrongWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Write Errors
// =============================================================================

/// Errors while persisting an artifact.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Destination not writable.
    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("Cannot serialize {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Computed filename would escape the destination directory.
    #[error("Unsafe artifact file name: {0}")]
    UnsafeFileName(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Returned by [`crate::transform::pipeline::process_file`] and friends.
/// Reading, normalization and filtering failures happen before any write.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type SheetResult<T> = Result<T, SheetError>;

pub type SchemaResult<T> = Result<T, SchemaError>;

pub type WriteResult<T> = Result<T, WriteError>;

pub type PipelineResult<T> = Result<T, PipelineError>;
