//! # gradeload - enrollment/grade spreadsheet to upload-ready CSV
//!
//! Turns a 9-column spreadsheet of course records into the two CSV files
//! the academic-records importer expects: one enrolling students into a
//! course section, one loading their grades.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌───────────────────┐
//! │ Spreadsheet │──▶│   Parser    │──▶│  Normalize  │──▶│    Filter    │──▶│ Project + Write ×2│
//! │ (xlsx/csv)  │   │ (auto-fmt)  │   │ (9 columns) │   │ (FRBA, nota) │   │ Alumnos / Notas   │
//! └─────────────┘   └─────────────┘   └─────────────┘   └──────────────┘   └───────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gradeload::{process_file, ReadOptions, RunContext};
//! use std::path::Path;
//!
//! let ctx = RunContext::new("ING-SIS", "A1", "ALG1", "2024-1C");
//! let output = process_file(Path::new("actas.xlsx"), &ctx, Path::new("processed"), ReadOptions::default())?;
//! println!("{} students", output.report.kept);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Cells, records, run context, projections
//! - [`parser`] - Workbook and delimited-text reading
//! - [`transform`] - Normalize, filter, project, pipeline
//! - [`writer`] - CSV artifact serialization
//! - [`config`] - Environment settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Reading
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod writer;

// Service
pub mod config;
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, PipelineError, SchemaError, ServerError, SheetError, WriteError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CanonicalRecord, CellValue, EnrollmentRow, FilteredRecord, GradeRow, RawRow, RunContext,
    CANONICAL_FIELDS,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{read_sheet_bytes, read_sheet_file, RawTable, ReadOptions, SheetFormat};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    coerce_numeric, filter_records, normalize, prepare, process_bytes, process_file,
    process_table, project_enrollment, project_grades, FilterReport, PipelineOutput,
    PipelineWarning, PreparedRun,
};

// =============================================================================
// Re-exports - Writer
// =============================================================================

pub use writer::{write_enrollment, write_grades, ArtifactKind, WrittenArtifact};

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
