//! High-level pipeline API: spreadsheet in, two CSV artifacts out.
//!
//! ```text
//! file → read → normalize → filter → { enrollment, grades } → write ×2
//! ```
//!
//! Reading, normalization and filtering complete before anything touches
//! the destination directory, so those failures leave no artifact behind.
//! The enrollment artifact is written first; if the grade write then fails
//! the enrollment file stays on disk (there is no rollback).
//!
//! # Example
//!
//! ```rust,ignore
//! use gradeload::{process_file, ReadOptions, RunContext};
//! use std::path::Path;
//!
//! let ctx = RunContext::new("ING-SIS", "A1", "ALG1", "2024-1C");
//! let output = process_file(Path::new("actas.xlsx"), &ctx, Path::new("processed"), ReadOptions::default())?;
//! println!("{}", output.grade.path.display());
//! ```

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::filter::{filter_records, FilterReport};
use super::normalize::normalize;
use super::project::{project_enrollment, project_grades};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::PipelineResult;
use crate::models::{EnrollmentRow, FilteredRecord, GradeRow, RunContext};
use crate::parser::{read_sheet_bytes, read_sheet_file, RawTable, ReadOptions, SheetFormat};
use crate::writer::{write_enrollment, write_grades, WrittenArtifact};

/// Non-fatal conditions observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineWarning {
    /// No record survived filtering; artifacts carry only headers.
    EmptyResult,
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::EmptyResult => f.write_str("no records survived filtering"),
        }
    }
}

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub format: SheetFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub row_count: usize,
}

impl SourceInfo {
    fn of(table: &RawTable) -> Self {
        Self {
            format: table.format,
            encoding: table.encoding.clone(),
            delimiter: table.delimiter,
            row_count: table.rows.len(),
        }
    }
}

/// Everything a run computes before writing.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub source: SourceInfo,
    pub records: Vec<FilteredRecord>,
    pub enrollment: Vec<EnrollmentRow>,
    pub grades: Vec<GradeRow>,
    pub report: FilterReport,
    pub warnings: Vec<PipelineWarning>,
}

/// Result of a complete run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub source: SourceInfo,
    pub enrollment: WrittenArtifact,
    pub grade: WrittenArtifact,
    pub report: FilterReport,
    pub warnings: Vec<PipelineWarning>,
}

/// Run the pipeline on a spreadsheet file.
pub fn process_file(
    path: &Path,
    ctx: &RunContext,
    dest_dir: &Path,
    options: ReadOptions,
) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {}...", path.display()));
    let table = read_sheet_file(path, options)?;
    process_table(table, ctx, dest_dir)
}

/// Run the pipeline on in-memory spreadsheet bytes.
pub fn process_bytes(
    bytes: &[u8],
    format: SheetFormat,
    ctx: &RunContext,
    dest_dir: &Path,
    options: ReadOptions,
) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {} bytes...", bytes.len()));
    let table = read_sheet_bytes(bytes, format, options)?;
    process_table(table, ctx, dest_dir)
}

/// Run the pipeline on an already-decoded table.
pub fn process_table(
    table: RawTable,
    ctx: &RunContext,
    dest_dir: &Path,
) -> PipelineResult<PipelineOutput> {
    let prepared = prepare(table, ctx)?;
    write_artifacts(prepared, ctx, dest_dir)
}

/// Normalize, filter and project without touching the filesystem.
pub fn prepare(table: RawTable, ctx: &RunContext) -> PipelineResult<PreparedRun> {
    let source = SourceInfo::of(&table);
    log_success(format!("Read {} data rows", source.row_count));
    if let Some(delimiter) = source.delimiter {
        log_info_source(&source, delimiter);
    }

    log_info("📋 Normalizing columns...");
    let records = normalize(table.rows)?;

    log_info("🔎 Filtering records...");
    let (records, report) = filter_records(records);
    log_success(format!("{} of {} records kept", report.kept, report.total));
    if report.dropped_campus > 0 {
        log_info(format!("{} dropped: other campus", report.dropped_campus));
    }
    if report.dropped_grade > 0 {
        log_info(format!("{} dropped: non-numeric grade", report.dropped_grade));
    }

    let mut warnings = Vec::new();
    if records.is_empty() {
        log_warning("No records survived filtering; artifacts will only carry headers");
        warnings.push(PipelineWarning::EmptyResult);
    }

    let enrollment = project_enrollment(&records, ctx);
    let grades = project_grades(&records);

    Ok(PreparedRun {
        source,
        records,
        enrollment,
        grades,
        report,
        warnings,
    })
}

/// Persist both artifacts of a prepared run, enrollment first.
pub fn write_artifacts(
    prepared: PreparedRun,
    ctx: &RunContext,
    dest_dir: &Path,
) -> PipelineResult<PipelineOutput> {
    log_info(format!("💾 Writing artifacts to {}...", dest_dir.display()));

    let enrollment = write_enrollment(dest_dir, ctx, &prepared.enrollment)?;
    log_success(format!("{} ({} rows)", enrollment.file_name, enrollment.rows));

    let grade = write_grades(dest_dir, ctx, &prepared.grades)?;
    log_success(format!("{} ({} rows)", grade.file_name, grade.rows));

    Ok(PipelineOutput {
        source: prepared.source,
        enrollment,
        grade,
        report: prepared.report,
        warnings: prepared.warnings,
    })
}

fn log_info_source(source: &SourceInfo, delimiter: char) {
    let shown = match delimiter {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    };
    log_info(format!(
        "Encoding: {}, separator: '{}'",
        source.encoding.as_deref().unwrap_or("?"),
        shown
    ));
}
