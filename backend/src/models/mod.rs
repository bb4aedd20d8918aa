//! Domain models for the gradeload pipeline.
//!
//! - [`CellValue`] - a typed spreadsheet cell
//! - [`CanonicalRecord`] - one source row with its 9 named fields
//! - [`FilteredRecord`] - the fields of a surviving record needed downstream
//! - [`RunContext`] - caller constants broadcast into every output row
//! - [`EnrollmentRow`] / [`GradeRow`] - the two artifact projections

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cells
// =============================================================================

/// A single spreadsheet cell.
///
/// Workbooks keep numeric cells numeric; delimited text only ever
/// produces [`CellValue::Text`] and [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Build a text cell, mapping the empty string to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Display form used for every string written to an artifact.
///
/// Floats use the shortest round-trip representation, so `8.0` prints as `8`.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

/// One source row, positionally significant.
pub type RawRow = Vec<CellValue>;

// =============================================================================
// Canonical schema
// =============================================================================

/// Canonical field names, in source column order.
pub const CANONICAL_FIELDS: [&str; 9] = [
    "Legajo",
    "Nota",
    "Promocion",
    "Apellido",
    "Nombre",
    "DNI",
    "Edicion",
    "FechaDeInicio",
    "FacultadRegional",
];

/// Number of columns every source row must have.
pub const CANONICAL_WIDTH: usize = CANONICAL_FIELDS.len();

/// A source row with its fields named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "Legajo")]
    pub legajo: CellValue,
    #[serde(rename = "Nota")]
    pub nota: CellValue,
    #[serde(rename = "Promocion")]
    pub promocion: CellValue,
    #[serde(rename = "Apellido")]
    pub apellido: CellValue,
    #[serde(rename = "Nombre")]
    pub nombre: CellValue,
    #[serde(rename = "DNI")]
    pub dni: CellValue,
    #[serde(rename = "Edicion")]
    pub edicion: CellValue,
    #[serde(rename = "FechaDeInicio")]
    pub fecha_de_inicio: CellValue,
    #[serde(rename = "FacultadRegional")]
    pub facultad_regional: CellValue,
}

impl CanonicalRecord {
    /// Assign names positionally, following [`CANONICAL_FIELDS`].
    pub fn from_cells(cells: [CellValue; CANONICAL_WIDTH]) -> Self {
        let [legajo, nota, promocion, apellido, nombre, dni, edicion, fecha_de_inicio, facultad_regional] =
            cells;
        Self {
            legajo,
            nota,
            promocion,
            apellido,
            nombre,
            dni,
            edicion,
            fecha_de_inicio,
            facultad_regional,
        }
    }
}

/// The part of a record that survives filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredRecord {
    #[serde(rename = "DNI")]
    pub dni: CellValue,
    #[serde(rename = "Nota")]
    pub nota: CellValue,
}

// =============================================================================
// Run context
// =============================================================================

/// Constants supplied by the caller for one run.
///
/// Used verbatim in broadcast columns and artifact file names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    pub propuesta: String,
    pub comision: String,
    pub actividad: String,
    pub periodo_lectivo: String,
}

impl RunContext {
    pub fn new(
        propuesta: impl Into<String>,
        comision: impl Into<String>,
        actividad: impl Into<String>,
        periodo_lectivo: impl Into<String>,
    ) -> Self {
        Self {
            propuesta: propuesta.into(),
            comision: comision.into(),
            actividad: actividad.into(),
            periodo_lectivo: periodo_lectivo.into(),
        }
    }

    /// Key shared by both artifacts of a run; runs with equal keys write the same files.
    pub fn artifact_key(&self) -> String {
        format!("{}_{}", self.comision, self.actividad)
    }
}

// =============================================================================
// Projections
// =============================================================================

/// Header of the enrollment artifact. The last column name contains a space.
pub const ENROLLMENT_HEADERS: [&str; 5] =
    ["DNI", "Propuesta", "Comision", "Actividad", "Periodo Lectivo"];

/// Header of the grade artifact.
pub const GRADE_HEADERS: [&str; 3] = ["DNI", "Nota", "CONCAT"];

/// One row of the enrollment artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentRow {
    pub dni: String,
    pub propuesta: String,
    pub comision: String,
    pub actividad: String,
    pub periodo_lectivo: String,
}

impl EnrollmentRow {
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.dni,
            &self.propuesta,
            &self.comision,
            &self.actividad,
            &self.periodo_lectivo,
        ]
    }
}

/// One row of the grade artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRow {
    pub dni: String,
    pub nota: String,
    pub concat: String,
}

impl GradeRow {
    pub fn fields(&self) -> [&str; 3] {
        [&self.dni, &self.nota, &self.concat]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Int(111).to_string(), "111");
        assert_eq!(CellValue::Float(8.5).to_string(), "8.5");
        assert_eq!(CellValue::Float(8.0).to_string(), "8");
        assert_eq!(CellValue::Float(30123456.0).to_string(), "30123456");
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::text("no-rindio").to_string(), "no-rindio");
    }

    #[test]
    fn test_empty_text_is_empty_cell() {
        assert!(CellValue::text("").is_empty());
        assert!(!CellValue::text(" ").is_empty());
    }

    #[test]
    fn test_from_cells_is_positional() {
        let cells: [CellValue; CANONICAL_WIDTH] = [
            "L1".into(),
            "8".into(),
            "2024".into(),
            "Perez".into(),
            "Ana".into(),
            "111".into(),
            "3".into(),
            "2024-03-01".into(),
            "FRBA".into(),
        ];
        let record = CanonicalRecord::from_cells(cells);
        assert_eq!(record.legajo, CellValue::text("L1"));
        assert_eq!(record.nota, CellValue::text("8"));
        assert_eq!(record.dni, CellValue::text("111"));
        assert_eq!(record.facultad_regional, CellValue::text("FRBA"));
    }

    #[test]
    fn test_canonical_record_serializes_with_field_names() {
        let record = CanonicalRecord::from_cells(Default::default());
        let json = serde_json::to_value(&record).unwrap();
        for field in CANONICAL_FIELDS {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_artifact_key() {
        let ctx = RunContext::new("ING", "A1", "ALG1", "2024");
        assert_eq!(ctx.artifact_key(), "A1_ALG1");
    }
}
