//! Projections of filtered records onto the two artifact shapes.

use crate::models::{EnrollmentRow, FilteredRecord, GradeRow, RunContext};

/// One enrollment row per record, with the run context broadcast.
///
/// DNIs are not deduplicated.
pub fn project_enrollment(records: &[FilteredRecord], ctx: &RunContext) -> Vec<EnrollmentRow> {
    records
        .iter()
        .map(|record| EnrollmentRow {
            dni: record.dni.to_string(),
            propuesta: ctx.propuesta.clone(),
            comision: ctx.comision.clone(),
            actividad: ctx.actividad.clone(),
            periodo_lectivo: ctx.periodo_lectivo.clone(),
        })
        .collect()
}

/// One grade row per record.
pub fn project_grades(records: &[FilteredRecord]) -> Vec<GradeRow> {
    records
        .iter()
        .map(|record| {
            let dni = record.dni.to_string();
            let nota = record.nota.to_string();
            GradeRow {
                concat: concat_field(&dni, &nota),
                dni,
                nota,
            }
        })
        .collect()
}

/// `DNI <dni>,<nota>`, not escaped.
pub fn concat_field(dni: &str, nota: &str) -> String {
    format!("DNI {},{}", dni, nota)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn filtered(dni: CellValue, nota: CellValue) -> FilteredRecord {
        FilteredRecord { dni, nota }
    }

    #[test]
    fn test_enrollment_broadcasts_context() {
        let ctx = RunContext::new("ING-SIS", "A1", "ALG1", "2024-1C");
        let records = vec![
            filtered(CellValue::text("111"), CellValue::text("8.5")),
            filtered(CellValue::Int(222), CellValue::Int(7)),
        ];

        let rows = project_enrollment(&records, &ctx);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields(), ["111", "ING-SIS", "A1", "ALG1", "2024-1C"]);
        assert_eq!(rows[1].fields(), ["222", "ING-SIS", "A1", "ALG1", "2024-1C"]);
    }

    #[test]
    fn test_enrollment_keeps_duplicate_dni() {
        let ctx = RunContext::default();
        let records = vec![
            filtered(CellValue::text("111"), CellValue::text("4")),
            filtered(CellValue::text("111"), CellValue::text("9")),
        ];
        assert_eq!(project_enrollment(&records, &ctx).len(), 2);
    }

    #[test]
    fn test_grade_concat() {
        let records = vec![
            filtered(CellValue::text("111"), CellValue::text("8.5")),
            filtered(CellValue::Float(30123456.0), CellValue::Float(7.0)),
        ];

        let rows = project_grades(&records);

        assert_eq!(rows[0].fields(), ["111", "8.5", "DNI 111,8.5"]);
        assert_eq!(rows[1].fields(), ["30123456", "7", "DNI 30123456,7"]);
    }

    #[test]
    fn test_grade_keeps_source_nota_text() {
        let rows = project_grades(&[filtered(CellValue::text("1"), CellValue::text(" 08.50"))]);
        assert_eq!(rows[0].nota, " 08.50");
        assert_eq!(rows[0].concat, "DNI 1, 08.50");
    }

    #[test]
    fn test_row_counts_match() {
        let ctx = RunContext::default();
        let records: Vec<_> = (0..5)
            .map(|i| filtered(CellValue::Int(i), CellValue::Int(i)))
            .collect();
        assert_eq!(project_enrollment(&records, &ctx).len(), records.len());
        assert_eq!(project_grades(&records).len(), records.len());
    }
}
