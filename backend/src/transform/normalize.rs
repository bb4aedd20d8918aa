//! Positional schema normalization.
//!
//! Every data row is renamed onto [`CANONICAL_FIELDS`]. Widths are checked
//! before any mapping so a shifted column never lands in the wrong field.

use crate::error::{SchemaError, SchemaResult};
use crate::models::{CanonicalRecord, CellValue, RawRow, CANONICAL_FIELDS, CANONICAL_WIDTH};

/// Normalize all rows, preserving order.
///
/// Fails on the first row whose width differs from [`CANONICAL_WIDTH`];
/// `row` in the error is 1-based over data rows.
pub fn normalize(rows: Vec<RawRow>) -> SchemaResult<Vec<CanonicalRecord>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| normalize_row(idx + 1, row))
        .collect()
}

/// Normalize a single row.
pub fn normalize_row(row_number: usize, row: RawRow) -> SchemaResult<CanonicalRecord> {
    let found = row.len();
    let cells: [CellValue; CANONICAL_WIDTH] =
        row.try_into().map_err(|_| SchemaError::WrongWidth {
            row: row_number,
            expected: CANONICAL_FIELDS.len(),
            found,
        })?;
    Ok(CanonicalRecord::from_cells(cells))
}
