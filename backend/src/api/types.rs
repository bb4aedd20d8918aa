//! REST API types.
//!
//! Top-level keys keep the names the upload page already consumes
//! (`success`, `processed_file_alumnos`, ...); the metadata block is camelCase.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::RunContext;
use crate::transform::pipeline::{PipelineOutput, PipelineWarning};

/// Generic message for any processing failure; details stay in the server log.
pub const INVALID_FORMAT: &str = "Archivo con formato incorrecto";
pub const NO_FILE: &str = "No se ha seleccionado ningún archivo";
pub const INVALID_FILE: &str = "Archivo no válido";
pub const PROCESSED_OK: &str = "Archivos procesados correctamente.";

/// Response sent after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: String,
    pub uploaded_filename: String,
    /// Download URL of the enrollment artifact
    pub processed_file_alumnos: String,
    /// Download URL of the grade artifact
    pub processed_file_notas: String,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub job_id: String,
    pub processed_at: String,
    pub context: RunContext,
    pub total_rows: usize,
    pub kept: usize,
    pub dropped_campus: usize,
    pub dropped_grade: usize,
    pub warnings: Vec<String>,
}

impl UploadResponse {
    pub fn new(uploaded_filename: String, ctx: RunContext, output: &PipelineOutput) -> Self {
        Self {
            success: PROCESSED_OK.to_string(),
            uploaded_filename,
            processed_file_alumnos: download_url(&output.enrollment.file_name),
            processed_file_notas: download_url(&output.grade.file_name),
            metadata: ResponseMetadata {
                job_id: Uuid::new_v4().to_string(),
                processed_at: chrono::Utc::now().to_rfc3339(),
                context: ctx,
                total_rows: output.report.total,
                kept: output.report.kept,
                dropped_campus: output.report.dropped_campus,
                dropped_grade: output.report.dropped_grade,
                warnings: output.warnings.iter().map(PipelineWarning::to_string).collect(),
            },
        }
    }
}

/// Query parameters of `/download`.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQuery {
    pub file: Option<String>,
}

/// `/download?file=<name>`, with the name form-encoded.
pub fn download_url(file_name: &str) -> String {
    let query = serde_urlencoded::to_string([("file", file_name)]).unwrap_or_default();
    format!("/download?{}", query)
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_encodes_name() {
        assert_eq!(
            download_url("Subir_Notas_A1_ALG1.csv"),
            "/download?file=Subir_Notas_A1_ALG1.csv"
        );
        assert_eq!(
            download_url("Subir_Notas_A 1_x&y.csv"),
            "/download?file=Subir_Notas_A+1_x%26y.csv"
        );
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response(INVALID_FORMAT);
        assert_eq!(body["error"], "Archivo con formato incorrecto");
    }
}
