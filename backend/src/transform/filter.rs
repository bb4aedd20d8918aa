//! Record filtering by campus and grade validity.
//!
//! Two independent predicates: `FacultadRegional` must be exactly
//! [`CAMPUS`], and `Nota` must coerce to a number. The grade value is
//! never rewritten, only judged.

use serde::Serialize;

use crate::models::{CanonicalRecord, CellValue, FilteredRecord};

/// Campus code retained by the filter (exact, case-sensitive).
pub const CAMPUS: &str = "FRBA";

/// Counters for one filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReport {
    pub total: usize,
    pub kept: usize,
    pub dropped_campus: usize,
    pub dropped_grade: usize,
}

/// Coerce a cell to a number, if it has one.
///
/// Int and Float cells are numeric; text is trimmed and parsed as an
/// integer or decimal literal. NaN, empty, booleans and anything
/// unparseable yield `None`.
pub fn coerce_numeric(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Int(i) => *i as f64,
        CellValue::Float(f) => *f,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Empty | CellValue::Bool(_) => return None,
    };
    (!value.is_nan()).then_some(value)
}

/// Campus predicate.
pub fn is_campus(record: &CanonicalRecord) -> bool {
    matches!(&record.facultad_regional, CellValue::Text(s) if s == CAMPUS)
}

/// Numeric-grade predicate.
pub fn has_numeric_grade(record: &CanonicalRecord) -> bool {
    coerce_numeric(&record.nota).is_some()
}

/// Keep records passing both predicates, in input order.
pub fn filter_records(records: Vec<CanonicalRecord>) -> (Vec<FilteredRecord>, FilterReport) {
    let mut report = FilterReport {
        total: records.len(),
        ..FilterReport::default()
    };

    let kept: Vec<FilteredRecord> = records
        .into_iter()
        .filter(|record| {
            if !is_campus(record) {
                report.dropped_campus += 1;
                false
            } else if !has_numeric_grade(record) {
                report.dropped_grade += 1;
                false
            } else {
                true
            }
        })
        .map(|record| FilteredRecord {
            dni: record.dni,
            nota: record.nota,
        })
        .collect();

    report.kept = kept.len();
    (kept, report)
}
